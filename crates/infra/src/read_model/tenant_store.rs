use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use seatwise_core::TenantId;

/// Tenant-partitioned record store. Every access names its tenant; there is no
/// cross-tenant read path.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V);
    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    fn list(&self, tenant_id: TenantId) -> Vec<V>;
    /// Some record of the tenant matching `pred`.
    fn find(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> Option<V>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        (**self).upsert(tenant_id, key, value)
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).remove(tenant_id, key)
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        (**self).list(tenant_id)
    }

    fn find(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> Option<V> {
        (**self).find(tenant_id, pred)
    }
}

/// In-memory store with one partition per tenant.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    partitions: RwLock<HashMap<TenantId, HashMap<K, V>>>,
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> InMemoryTenantStore<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held for the tenant.
    pub fn count(&self, tenant_id: TenantId) -> usize {
        self.partitions
            .read()
            .map(|p| p.get(&tenant_id).map_or(0, HashMap::len))
            .unwrap_or(0)
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let partitions = self.partitions.read().ok()?;
        partitions.get(&tenant_id)?.get(key).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        if let Ok(mut partitions) = self.partitions.write() {
            partitions.entry(tenant_id).or_default().insert(key, value);
        }
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let mut partitions = self.partitions.write().ok()?;
        let partition = partitions.get_mut(&tenant_id)?;
        let removed = partition.remove(key);
        if partition.is_empty() {
            partitions.remove(&tenant_id);
        }
        removed
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        self.partitions
            .read()
            .ok()
            .and_then(|p| p.get(&tenant_id).map(|records| records.values().cloned().collect()))
            .unwrap_or_default()
    }

    fn find(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> Option<V> {
        let partitions = self.partitions.read().ok()?;
        partitions.get(&tenant_id)?.values().find(|v| pred(v)).cloned()
    }
}
