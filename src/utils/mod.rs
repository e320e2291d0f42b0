pub mod date;
pub mod formatting;
pub mod path;
pub mod table;

pub use formatting::describe_status;
pub use formatting::hours2readable;
