//! Seat Ledger: per-(tenant, unit) seat pools and the enrollments that consume
//! them.

pub mod in_memory;
pub mod postgres;
pub mod service;
pub mod store;

pub use in_memory::InMemorySeatLedgerStore;
pub use postgres::PostgresSeatLedgerStore;
pub use service::{RetryPolicy, SeatLedger};
pub use store::{EnrollmentFilter, SeatLedgerStore, StoreError};
