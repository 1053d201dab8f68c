use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use seatwise_core::{EnrollmentId, ExpectedVersion, MemberId, TenantId, UnitId, Versioned};
use seatwise_licensing::{Enrollment, SeatPool};

use super::store::{EnrollmentFilter, SeatLedgerStore, StoreError};

type PoolKey = (TenantId, UnitId);
type EnrollmentKey = (TenantId, UnitId, MemberId);

#[derive(Debug, Default)]
struct Ledger {
    pools: HashMap<PoolKey, SeatPool>,
    enrollments: HashMap<EnrollmentKey, Enrollment>,
}

/// In-memory seat ledger for tests/dev.
///
/// Pools and enrollments share one lock so a commit swaps both at once.
#[derive(Debug, Default)]
pub struct InMemorySeatLedgerStore {
    inner: RwLock<Ledger>,
}

impl InMemorySeatLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

fn check_version(ledger: &Ledger, pool: &SeatPool, expected: ExpectedVersion) -> Result<(), StoreError> {
    let key = (pool.tenant_id(), pool.unit_id().clone());
    let current = ledger.pools.get(&key).map(Versioned::version);
    if expected.matches(current) {
        Ok(())
    } else {
        Err(StoreError::Conflict(format!(
            "seat pool {}: expected {expected:?}, found {current:?}",
            pool.unit_id()
        )))
    }
}

#[async_trait]
impl SeatLedgerStore for InMemorySeatLedgerStore {
    async fn load_pool(&self, tenant_id: TenantId, unit_id: &UnitId) -> Result<Option<SeatPool>, StoreError> {
        let ledger = self.inner.read().map_err(|_| poisoned())?;
        Ok(ledger.pools.get(&(tenant_id, unit_id.clone())).cloned())
    }

    async fn list_pools(&self, tenant_id: TenantId) -> Result<Vec<SeatPool>, StoreError> {
        let ledger = self.inner.read().map_err(|_| poisoned())?;
        let mut out: Vec<SeatPool> = ledger
            .pools
            .iter()
            .filter(|((t, _), _)| *t == tenant_id)
            .map(|(_, pool)| pool.clone())
            .collect();
        out.sort_by(|a, b| a.unit_id().cmp(b.unit_id()));
        Ok(out)
    }

    async fn find_enrollment(
        &self,
        tenant_id: TenantId,
        unit_id: &UnitId,
        member_id: MemberId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let ledger = self.inner.read().map_err(|_| poisoned())?;
        Ok(ledger
            .enrollments
            .get(&(tenant_id, unit_id.clone(), member_id))
            .cloned())
    }

    async fn list_enrollments(
        &self,
        tenant_id: TenantId,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let ledger = self.inner.read().map_err(|_| poisoned())?;
        let mut out: Vec<Enrollment> = ledger
            .enrollments
            .values()
            .filter(|e| e.tenant_id == tenant_id && filter.matches(e))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.member_id.cmp(&b.member_id).then_with(|| a.unit_id.cmp(&b.unit_id)));
        Ok(out)
    }

    async fn commit_allocation(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment: &Enrollment,
    ) -> Result<(), StoreError> {
        let mut ledger = self.inner.write().map_err(|_| poisoned())?;
        check_version(&ledger, pool, expected)?;

        let key = (enrollment.tenant_id, enrollment.unit_id.clone(), enrollment.member_id);
        if ledger.enrollments.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "member {} already enrolled in {}",
                enrollment.member_id, enrollment.unit_id
            )));
        }

        ledger.enrollments.insert(key, enrollment.clone());
        ledger
            .pools
            .insert((pool.tenant_id(), pool.unit_id().clone()), pool.clone());
        Ok(())
    }

    async fn commit_release(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment_id: EnrollmentId,
    ) -> Result<(), StoreError> {
        let mut ledger = self.inner.write().map_err(|_| poisoned())?;
        check_version(&ledger, pool, expected)?;

        let key = ledger
            .enrollments
            .iter()
            .find(|(_, e)| e.id == enrollment_id && e.tenant_id == pool.tenant_id())
            .map(|(k, _)| k.clone())
            .ok_or_else(|| StoreError::Conflict(format!("enrollment {enrollment_id} already released")))?;

        ledger.enrollments.remove(&key);
        ledger
            .pools
            .insert((pool.tenant_id(), pool.unit_id().clone()), pool.clone());
        Ok(())
    }

    async fn save_purchase(&self, pool: &SeatPool, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut ledger = self.inner.write().map_err(|_| poisoned())?;
        check_version(&ledger, pool, expected)?;
        ledger
            .pools
            .insert((pool.tenant_id(), pool.unit_id().clone()), pool.clone());
        Ok(())
    }
}
