//! Read-only boundaries to collaborators this system does not own.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use seatwise_core::{IdentityId, UnitId};

use crate::record::ProgressRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Keyed lookup of a member's progress for one unit.
///
/// `Ok(None)` means the member has no record yet (not started), which is
/// distinct from a failed fetch.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn fetch(
        &self,
        identity: IdentityId,
        unit_id: &UnitId,
    ) -> Result<Option<ProgressRecord>, FetchError>;
}

/// Display metadata for a licensed unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitInfo {
    pub unit_id: UnitId,
    pub title: String,
    pub total_units: u32,
}

impl UnitInfo {
    /// Placeholder used when the catalog has no entry: the id doubles as title.
    pub fn unknown(unit_id: &UnitId) -> Self {
        Self {
            unit_id: unit_id.clone(),
            title: unit_id.to_string(),
            total_units: 0,
        }
    }
}

#[async_trait]
pub trait UnitCatalog: Send + Sync {
    async fn unit(&self, unit_id: &UnitId) -> Result<Option<UnitInfo>, FetchError>;
}

#[async_trait]
impl<S> ProgressStore for Arc<S>
where
    S: ProgressStore + ?Sized,
{
    async fn fetch(
        &self,
        identity: IdentityId,
        unit_id: &UnitId,
    ) -> Result<Option<ProgressRecord>, FetchError> {
        (**self).fetch(identity, unit_id).await
    }
}

#[async_trait]
impl<C> UnitCatalog for Arc<C>
where
    C: UnitCatalog + ?Sized,
{
    async fn unit(&self, unit_id: &UnitId) -> Result<Option<UnitInfo>, FetchError> {
        (**self).unit(unit_id).await
    }
}
