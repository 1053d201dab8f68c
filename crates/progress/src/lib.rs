//! `seatwise-progress`
//!
//! Classification and ranking of member progress, plus the read-only
//! boundaries to the external progress store and unit catalog.
//!
//! Everything here except the boundary traits is pure and synchronous; the
//! aggregation engine in `seatwise-infra` drives the IO.

pub mod classify;
pub mod export;
pub mod record;
pub mod source;
pub mod view;

pub use classify::{Classification, Status, classify};
pub use export::{CSV_HEADER, to_csv};
pub use record::ProgressRecord;
pub use source::{FetchError, ProgressStore, UnitCatalog, UnitInfo};
pub use view::{DashboardView, MemberRow, Summary, rank, summarize};
