//! Pure domain logic for AuraFarm: geofence distance, UTC calendar-day
//! arithmetic, and the streak decision function. No I/O anywhere in this
//! crate; everything here is deterministic and unit-testable in isolation.

pub mod calendar;
pub mod geo;
pub mod streak;
