pub mod calculator;
pub mod certification;
pub mod clock;
pub mod engine;
pub mod ledger;
pub mod rules;
pub mod trips;
pub mod violations;
