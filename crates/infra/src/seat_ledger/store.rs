use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use seatwise_core::{EnrollmentId, ExpectedVersion, MemberId, TenantId, UnitId};
use seatwise_licensing::{Enrollment, LicensingError, SeatPool};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The compare-and-swap lost: the pool version moved or the enrollment
    /// row changed underneath the caller.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for LicensingError {
    fn from(err: StoreError) -> Self {
        LicensingError::Store(err.to_string())
    }
}

/// Narrow the enrollment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentFilter {
    pub unit_id: Option<UnitId>,
    pub member_id: Option<MemberId>,
}

impl EnrollmentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn unit(unit_id: UnitId) -> Self {
        Self {
            unit_id: Some(unit_id),
            member_id: None,
        }
    }

    pub fn member(member_id: MemberId) -> Self {
        Self {
            unit_id: None,
            member_id: Some(member_id),
        }
    }

    pub fn matches(&self, e: &Enrollment) -> bool {
        self.unit_id.as_ref().is_none_or(|u| *u == e.unit_id)
            && self.member_id.is_none_or(|m| m == e.member_id)
    }
}

/// Persistence boundary of the Seat Ledger.
///
/// Each `commit_*` call is atomic: the pool counters and the enrollment row
/// change together or not at all, and only when the stored pool is still at
/// `expected`.
#[async_trait]
pub trait SeatLedgerStore: Send + Sync {
    async fn load_pool(&self, tenant_id: TenantId, unit_id: &UnitId) -> Result<Option<SeatPool>, StoreError>;

    /// Every pool the tenant has purchased, ordered by unit id.
    async fn list_pools(&self, tenant_id: TenantId) -> Result<Vec<SeatPool>, StoreError>;

    async fn find_enrollment(
        &self,
        tenant_id: TenantId,
        unit_id: &UnitId,
        member_id: MemberId,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Enrollments ordered by (member id, unit id).
    async fn list_enrollments(
        &self,
        tenant_id: TenantId,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, StoreError>;

    /// Write the incremented pool and insert `enrollment`. Fails with
    /// `Conflict` when the version moved or the member already holds a seat.
    async fn commit_allocation(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment: &Enrollment,
    ) -> Result<(), StoreError>;

    /// Write the decremented pool and delete `enrollment_id`. Fails with
    /// `Conflict` when the version moved or the enrollment is already gone.
    async fn commit_release(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment_id: EnrollmentId,
    ) -> Result<(), StoreError>;

    /// Create (`expected == Absent`) or grow a pool.
    async fn save_purchase(&self, pool: &SeatPool, expected: ExpectedVersion) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> SeatLedgerStore for Arc<S>
where
    S: SeatLedgerStore + ?Sized,
{
    async fn load_pool(&self, tenant_id: TenantId, unit_id: &UnitId) -> Result<Option<SeatPool>, StoreError> {
        (**self).load_pool(tenant_id, unit_id).await
    }

    async fn list_pools(&self, tenant_id: TenantId) -> Result<Vec<SeatPool>, StoreError> {
        (**self).list_pools(tenant_id).await
    }

    async fn find_enrollment(
        &self,
        tenant_id: TenantId,
        unit_id: &UnitId,
        member_id: MemberId,
    ) -> Result<Option<Enrollment>, StoreError> {
        (**self).find_enrollment(tenant_id, unit_id, member_id).await
    }

    async fn list_enrollments(
        &self,
        tenant_id: TenantId,
        filter: &EnrollmentFilter,
    ) -> Result<Vec<Enrollment>, StoreError> {
        (**self).list_enrollments(tenant_id, filter).await
    }

    async fn commit_allocation(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment: &Enrollment,
    ) -> Result<(), StoreError> {
        (**self).commit_allocation(pool, expected, enrollment).await
    }

    async fn commit_release(
        &self,
        pool: &SeatPool,
        expected: ExpectedVersion,
        enrollment_id: EnrollmentId,
    ) -> Result<(), StoreError> {
        (**self).commit_release(pool, expected, enrollment_id).await
    }

    async fn save_purchase(&self, pool: &SeatPool, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save_purchase(pool, expected).await
    }
}
