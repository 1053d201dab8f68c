//! Infrastructure layer: stores, services and configuration behind the API.

pub mod aggregation;
pub mod config;
pub mod directory;
pub mod progress;
pub mod read_model;
pub mod roster;
pub mod seat_ledger;

#[cfg(test)]
mod test_support;
