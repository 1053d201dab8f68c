use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use seatwise_auth::{AdminContext, Permission};
use seatwise_core::{Clock, ExpectedVersion, MemberId, TenantId, UnitId};
use seatwise_licensing::{Enrollment, LicensingError, LicensingResult, PoolStatus, SeatPool};

use crate::directory::MemberDirectory;

use super::store::{EnrollmentFilter, SeatLedgerStore, StoreError};

/// Bounded compare-and-swap retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_step: Duration::from_millis(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Seat allocation, release and purchase over a [`SeatLedgerStore`].
///
/// The per-pool compare-and-swap is the only serialization point: two
/// allocations racing for the last seat cannot both commit.
#[derive(Clone)]
pub struct SeatLedger {
    store: Arc<dyn SeatLedgerStore>,
    members: Arc<dyn MemberDirectory>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl SeatLedger {
    pub fn new(
        store: Arc<dyn SeatLedgerStore>,
        members: Arc<dyn MemberDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            members,
            clock,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bind `member_id` to one seat of the unit's pool.
    ///
    /// Idempotent: an existing enrollment is returned unchanged.
    #[instrument(
        skip(self, ctx),
        fields(tenant_id = %ctx.tenant_id(), unit_id = %unit_id, member_id = %member_id),
        err
    )]
    pub async fn allocate(
        &self,
        ctx: &AdminContext,
        unit_id: &UnitId,
        member_id: MemberId,
    ) -> LicensingResult<Enrollment> {
        ctx.require(&Permission::MANAGE_MEMBERS)?;
        let tenant_id = ctx.tenant_id();

        self.require_active_member(tenant_id, member_id).await?;

        for attempt in 1..=self.retry.max_attempts {
            if let Some(existing) = self.store.find_enrollment(tenant_id, unit_id, member_id).await? {
                return Ok(existing);
            }

            let mut pool = self.require_pool(tenant_id, unit_id).await?;
            let expected = ExpectedVersion::of(&pool);
            pool.allocate_one()?;

            let enrollment = Enrollment::new(tenant_id, unit_id.clone(), member_id, self.clock.now());
            match self.store.commit_allocation(&pool, expected, &enrollment).await {
                Ok(()) => {
                    // A member deactivated mid-allocation must not keep the seat.
                    if let Err(err) = self.require_active_member(tenant_id, member_id).await {
                        warn!(tenant_id = %tenant_id, member_id = %member_id, "member left active status during allocation; releasing seat");
                        self.release(ctx, unit_id, member_id).await?;
                        return Err(err);
                    }
                    info!(
                        tenant_id = %tenant_id,
                        unit_id = %unit_id,
                        member_id = %member_id,
                        used = pool.used(),
                        total = pool.total(),
                        "seat allocated"
                    );
                    return Ok(enrollment);
                }
                Err(StoreError::Conflict(reason)) => {
                    warn!(attempt, %reason, "seat allocation lost compare-and-swap; retrying");
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Out of attempts: report what the pool looks like now.
        if let Some(existing) = self.store.find_enrollment(tenant_id, unit_id, member_id).await? {
            return Ok(existing);
        }
        let pool = self.require_pool(tenant_id, unit_id).await?;
        if pool.is_full() {
            Err(LicensingError::SeatsExhausted {
                tenant_id,
                unit_id: unit_id.clone(),
            })
        } else {
            Err(LicensingError::Contention {
                tenant_id,
                unit_id: unit_id.clone(),
                attempts: self.retry.max_attempts,
            })
        }
    }

    /// Free the member's seat in the unit's pool. No-op without an enrollment.
    #[instrument(
        skip(self, ctx),
        fields(tenant_id = %ctx.tenant_id(), unit_id = %unit_id, member_id = %member_id),
        err
    )]
    pub async fn release(
        &self,
        ctx: &AdminContext,
        unit_id: &UnitId,
        member_id: MemberId,
    ) -> LicensingResult<()> {
        ctx.require(&Permission::MANAGE_MEMBERS)?;
        let tenant_id = ctx.tenant_id();

        for attempt in 1..=self.retry.max_attempts {
            let Some(enrollment) = self.store.find_enrollment(tenant_id, unit_id, member_id).await? else {
                return Ok(());
            };

            let mut pool = self.require_pool(tenant_id, unit_id).await?;
            let expected = ExpectedVersion::of(&pool);
            pool.release_one()?;

            match self.store.commit_release(&pool, expected, enrollment.id).await {
                Ok(()) => {
                    info!(
                        tenant_id = %tenant_id,
                        unit_id = %unit_id,
                        member_id = %member_id,
                        used = pool.used(),
                        total = pool.total(),
                        "seat released"
                    );
                    return Ok(());
                }
                Err(StoreError::Conflict(reason)) => {
                    warn!(attempt, %reason, "seat release lost compare-and-swap; retrying");
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if self.store.find_enrollment(tenant_id, unit_id, member_id).await?.is_none() {
            return Ok(());
        }
        Err(LicensingError::Contention {
            tenant_id,
            unit_id: unit_id.clone(),
            attempts: self.retry.max_attempts,
        })
    }

    /// Release every seat the member holds in the tenant.
    pub async fn release_all(&self, ctx: &AdminContext, member_id: MemberId) -> LicensingResult<usize> {
        let held = self.enrollments_for_member(ctx.tenant_id(), member_id).await?;
        for enrollment in &held {
            self.release(ctx, &enrollment.unit_id, member_id).await?;
        }
        Ok(held.len())
    }

    /// Create the pool or add capacity to it. Capacity never decreases.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id(), unit_id = %unit_id), err)]
    pub async fn purchase(&self, ctx: &AdminContext, unit_id: &UnitId, seats: u32) -> LicensingResult<PoolStatus> {
        ctx.require(&Permission::MANAGE_BILLING)?;
        let tenant_id = ctx.tenant_id();

        for attempt in 1..=self.retry.max_attempts {
            let (pool, expected) = match self.store.load_pool(tenant_id, unit_id).await? {
                Some(mut pool) => {
                    let expected = ExpectedVersion::of(&pool);
                    pool.add_seats(seats)?;
                    (pool, expected)
                }
                None => (SeatPool::open(tenant_id, unit_id.clone(), seats)?, ExpectedVersion::Absent),
            };

            match self.store.save_purchase(&pool, expected).await {
                Ok(()) => {
                    info!(
                        tenant_id = %tenant_id,
                        unit_id = %unit_id,
                        seats,
                        total = pool.total(),
                        "seats purchased"
                    );
                    return Ok(pool.status());
                }
                Err(StoreError::Conflict(reason)) => {
                    warn!(attempt, %reason, "seat purchase lost compare-and-swap; retrying");
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LicensingError::Contention {
            tenant_id,
            unit_id: unit_id.clone(),
            attempts: self.retry.max_attempts,
        })
    }

    /// Read-only counters for a pool.
    pub async fn pool_status(&self, tenant_id: TenantId, unit_id: &UnitId) -> LicensingResult<PoolStatus> {
        Ok(self.require_pool(tenant_id, unit_id).await?.status())
    }

    /// Counters for every pool the tenant has purchased, ordered by unit id.
    pub async fn pools(&self, tenant_id: TenantId) -> LicensingResult<Vec<PoolStatus>> {
        let pools = self.store.list_pools(tenant_id).await?;
        Ok(pools.iter().map(SeatPool::status).collect())
    }

    pub async fn enrollments_for_member(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> LicensingResult<Vec<Enrollment>> {
        Ok(self
            .store
            .list_enrollments(tenant_id, &EnrollmentFilter::member(member_id))
            .await?)
    }

    /// All enrollments of the tenant, optionally restricted to one unit.
    pub async fn enrollments(
        &self,
        tenant_id: TenantId,
        unit_filter: Option<&UnitId>,
    ) -> LicensingResult<Vec<Enrollment>> {
        let filter = EnrollmentFilter {
            unit_id: unit_filter.cloned(),
            member_id: None,
        };
        Ok(self.store.list_enrollments(tenant_id, &filter).await?)
    }

    async fn require_active_member(&self, tenant_id: TenantId, member_id: MemberId) -> LicensingResult<()> {
        let member = self
            .members
            .member(tenant_id, member_id)
            .await
            .map_err(|e| LicensingError::Store(e.to_string()))?
            .ok_or(LicensingError::MemberNotFound { tenant_id, member_id })?;
        if member.is_active() {
            Ok(())
        } else {
            Err(LicensingError::MemberNotActive { tenant_id, member_id })
        }
    }

    async fn require_pool(&self, tenant_id: TenantId, unit_id: &UnitId) -> LicensingResult<SeatPool> {
        self.store
            .load_pool(tenant_id, unit_id)
            .await?
            .ok_or_else(|| LicensingError::PoolNotFound {
                tenant_id,
                unit_id: unit_id.clone(),
            })
    }
}
