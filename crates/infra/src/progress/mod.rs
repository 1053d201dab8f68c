//! Adapters for the external progress store and unit catalog.

pub mod in_memory;

pub use in_memory::{InMemoryProgressStore, InMemoryUnitCatalog};
