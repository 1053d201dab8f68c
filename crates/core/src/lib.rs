//! `seatwise-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every other crate
//! (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod version;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{EnrollmentId, IdentityId, MemberId, TenantId, UnitId};
pub use version::{ExpectedVersion, Versioned};
