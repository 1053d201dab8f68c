//! Seat licensing domain: seat pools, enrollments and their invariants.
//!
//! Pure decisions only. Persistence and compare-and-swap retries live in
//! `seatwise-infra`.

pub mod enrollment;
pub mod error;
pub mod pool;

pub use enrollment::Enrollment;
pub use error::{LicensingError, LicensingResult};
pub use pool::{PoolStatus, SeatPool};
