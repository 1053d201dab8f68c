use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use seatwise_core::{IdentityId, UnitId};
use seatwise_progress::{FetchError, ProgressRecord, ProgressStore, UnitCatalog, UnitInfo};

type Key = (IdentityId, UnitId);

/// Scripted behaviour for one (identity, unit) key.
#[derive(Debug, Clone)]
enum Behaviour {
    Fail(String),
    Delay(Duration),
}

/// In-memory progress store for tests/dev, with injectable failures and
/// latency per key.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    records: RwLock<HashMap<Key, ProgressRecord>>,
    behaviours: RwLock<HashMap<Key, Behaviour>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, identity: IdentityId, unit_id: UnitId, record: ProgressRecord) {
        if let Ok(mut map) = self.records.write() {
            map.insert((identity, unit_id), record);
        }
    }

    /// Make every fetch for the key fail.
    pub fn fail_for(&self, identity: IdentityId, unit_id: UnitId, reason: impl Into<String>) {
        if let Ok(mut map) = self.behaviours.write() {
            map.insert((identity, unit_id), Behaviour::Fail(reason.into()));
        }
    }

    /// Make every fetch for the key sleep before answering.
    pub fn delay_for(&self, identity: IdentityId, unit_id: UnitId, delay: Duration) {
        if let Ok(mut map) = self.behaviours.write() {
            map.insert((identity, unit_id), Behaviour::Delay(delay));
        }
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn fetch(
        &self,
        identity: IdentityId,
        unit_id: &UnitId,
    ) -> Result<Option<ProgressRecord>, FetchError> {
        let key = (identity, unit_id.clone());
        let behaviour = self
            .behaviours
            .read()
            .map_err(|_| FetchError::Unavailable("lock poisoned".to_string()))?
            .get(&key)
            .cloned();

        match behaviour {
            Some(Behaviour::Fail(reason)) => return Err(FetchError::Unavailable(reason)),
            Some(Behaviour::Delay(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }

        let records = self
            .records
            .read()
            .map_err(|_| FetchError::Unavailable("lock poisoned".to_string()))?;
        Ok(records.get(&key).cloned())
    }
}

/// In-memory licensed-unit catalog.
#[derive(Debug, Default)]
pub struct InMemoryUnitCatalog {
    units: RwLock<HashMap<UnitId, UnitInfo>>,
}

impl InMemoryUnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, unit_id: UnitId, title: impl Into<String>, total_units: u32) {
        if let Ok(mut map) = self.units.write() {
            map.insert(
                unit_id.clone(),
                UnitInfo {
                    unit_id,
                    title: title.into(),
                    total_units,
                },
            );
        }
    }
}

#[async_trait]
impl UnitCatalog for InMemoryUnitCatalog {
    async fn unit(&self, unit_id: &UnitId) -> Result<Option<UnitInfo>, FetchError> {
        let map = self
            .units
            .read()
            .map_err(|_| FetchError::Unavailable("lock poisoned".to_string()))?;
        Ok(map.get(unit_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_record_is_none_and_failures_surface() {
        let store = InMemoryProgressStore::new();
        let who = IdentityId::new();
        let unit = UnitId::new("U1").unwrap();

        assert_eq!(store.fetch(who, &unit).await, Ok(None));

        store.put(who, unit.clone(), ProgressRecord::new(40.0, None));
        assert_eq!(store.fetch(who, &unit).await.unwrap().unwrap().progress_percent(), 40.0);

        store.fail_for(who, unit.clone(), "boom");
        assert_eq!(
            store.fetch(who, &unit).await,
            Err(FetchError::Unavailable("boom".to_string()))
        );
    }
}
