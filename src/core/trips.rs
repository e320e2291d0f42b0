//! Trip linkage seam. The engine asks once per status change and stores
//! whatever reference comes back; `None` is a perfectly valid answer.

pub trait TripResolver: Send + Sync {
    fn resolve(&self, driver_id: i64) -> Option<i64>;
}

/// No trip tracking at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrip;

impl TripResolver for NoTrip {
    fn resolve(&self, _driver_id: i64) -> Option<i64> {
        None
    }
}

/// Caller already knows the trip (or knows there is none).
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedTrip(pub Option<i64>);

impl TripResolver for FixedTrip {
    fn resolve(&self, _driver_id: i64) -> Option<i64> {
        self.0
    }
}
