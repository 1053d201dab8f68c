use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use seatwise_auth::{AuthzError, DirectoryError, IdentityGate, Permission};
use seatwise_core::{Clock, IdentityId, MemberId, TenantId, UnitId};
use seatwise_licensing::{Enrollment, LicensingError};
use seatwise_progress::{
    Classification, DashboardView, FetchError, MemberRow, ProgressRecord, ProgressStore, UnitCatalog,
    UnitInfo, rank, summarize, to_csv,
};
use seatwise_tenancy::{Member, MemberStatus};

use crate::directory::MemberDirectory;
use crate::seat_ledger::SeatLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub stale_days: u32,
    pub fetch_timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stale_days: 7,
            fetch_timeout: Duration::from_secs(3),
            max_concurrent_fetches: 16,
        }
    }
}

impl EngineConfig {
    pub fn with_stale_days(mut self, days: u32) -> Self {
        self.stale_days = days;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n.max(1);
        self
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("member {member_id} not found in tenant {tenant_id}")]
    MemberNotFound { tenant_id: TenantId, member_id: MemberId },

    #[error(transparent)]
    Licensing(#[from] LicensingError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Roster entry as shown to admins. Never carries the invite token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub member_id: MemberId,
    pub display_name: String,
    pub contact_address: String,
    pub job_title: Option<String>,
    pub status: MemberStatus,
    pub invited_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl From<&Member> for MemberProfile {
    fn from(m: &Member) -> Self {
        Self {
            member_id: m.id(),
            display_name: m.display_name().to_string(),
            contact_address: m.contact().to_string(),
            job_title: m.job_title().map(str::to_string),
            status: m.status(),
            invited_at: m.invited_at(),
            activated_at: m.activated_at(),
            deactivated_at: m.deactivated_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub member: MemberProfile,
    pub enrollments: Vec<MemberRow>,
}

/// A purchased unit with its catalog entry and seat counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensedUnit {
    pub unit_id: UnitId,
    pub title: String,
    pub total_units: u32,
    pub total_seats: u32,
    pub used_seats: u32,
    pub available_seats: u32,
}

type FetchOutcome = Result<Option<ProgressRecord>, FetchError>;

/// Builds the progress dashboard for a tenant.
///
/// Progress is fetched per (member, enrollment) with bounded concurrency and a
/// per-fetch deadline. A failed fetch degrades its row; it never fails the
/// request.
pub struct DashboardEngine {
    gate: IdentityGate,
    members: Arc<dyn MemberDirectory>,
    ledger: Arc<SeatLedger>,
    progress: Arc<dyn ProgressStore>,
    catalog: Arc<dyn UnitCatalog>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl DashboardEngine {
    pub fn new(
        gate: IdentityGate,
        members: Arc<dyn MemberDirectory>,
        ledger: Arc<SeatLedger>,
        progress: Arc<dyn ProgressStore>,
        catalog: Arc<dyn UnitCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate,
            members,
            ledger,
            progress,
            catalog,
            clock,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    #[instrument(skip_all, fields(tenant_id = %tenant_id, caller = %caller), err)]
    pub async fn build_dashboard(
        &self,
        tenant_id: TenantId,
        caller: IdentityId,
        unit_filter: Option<&UnitId>,
    ) -> Result<DashboardView, DashboardError> {
        self.gate
            .authorize_for(tenant_id, caller, &Permission::VIEW_REPORTS)
            .await?;
        let now = self.clock.now();

        let members = self.members.active_members(tenant_id).await?;
        let mut by_member: HashMap<MemberId, Vec<Enrollment>> = HashMap::new();
        for enrollment in self.ledger.enrollments(tenant_id, unit_filter).await? {
            by_member.entry(enrollment.member_id).or_default().push(enrollment);
        }

        let pairs: Vec<(Member, Enrollment)> = members
            .iter()
            .flat_map(|member| {
                by_member
                    .remove(&member.id())
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |enrollment| (member.clone(), enrollment))
            })
            .collect();

        let mut rows = self.collect_rows(pairs, now).await;
        rank(&mut rows);
        let summary = summarize(members.len(), &rows);

        info!(
            tenant_id = %tenant_id,
            members = members.len(),
            rows = rows.len(),
            unavailable = rows.iter().filter(|r| r.data_unavailable).count(),
            "dashboard built"
        );
        Ok(DashboardView { summary, rows })
    }

    /// One member with every enrollment they hold, classified the same way as
    /// the dashboard.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, member_id = %member_id), err)]
    pub async fn member_detail(
        &self,
        tenant_id: TenantId,
        caller: IdentityId,
        member_id: MemberId,
    ) -> Result<MemberDetail, DashboardError> {
        self.gate
            .authorize_for(tenant_id, caller, &Permission::VIEW_REPORTS)
            .await?;
        let now = self.clock.now();

        let member = self
            .members
            .member(tenant_id, member_id)
            .await?
            .ok_or(DashboardError::MemberNotFound { tenant_id, member_id })?;

        let pairs = self
            .ledger
            .enrollments_for_member(tenant_id, member_id)
            .await?
            .into_iter()
            .map(|enrollment| (member.clone(), enrollment))
            .collect();

        let mut enrollments = self.collect_rows(pairs, now).await;
        rank(&mut enrollments);
        Ok(MemberDetail {
            member: MemberProfile::from(&member),
            enrollments,
        })
    }

    /// Every unit the tenant holds seats for, in unit order, with catalog
    /// titles.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, caller = %caller), err)]
    pub async fn licensed_units(
        &self,
        tenant_id: TenantId,
        caller: IdentityId,
    ) -> Result<Vec<LicensedUnit>, DashboardError> {
        self.gate
            .authorize_for(tenant_id, caller, &Permission::VIEW_REPORTS)
            .await?;

        let pools = self.ledger.pools(tenant_id).await?;
        let units = pools.iter().map(|p| p.unit_id.clone()).collect();
        let mut catalog = self.lookup_units(units, &self.fetch_permits()).await;

        Ok(pools
            .into_iter()
            .map(|pool| {
                let info = catalog
                    .remove(&pool.unit_id)
                    .unwrap_or_else(|| UnitInfo::unknown(&pool.unit_id));
                LicensedUnit {
                    unit_id: pool.unit_id,
                    title: info.title,
                    total_units: info.total_units,
                    total_seats: pool.total,
                    used_seats: pool.used,
                    available_seats: pool.available,
                }
            })
            .collect())
    }

    /// The ranked dashboard rows as CSV.
    pub async fn export_csv(
        &self,
        tenant_id: TenantId,
        caller: IdentityId,
        unit_filter: Option<&UnitId>,
    ) -> Result<String, DashboardError> {
        let view = self.build_dashboard(tenant_id, caller, unit_filter).await?;
        Ok(to_csv(&view.rows))
    }

    async fn collect_rows(&self, pairs: Vec<(Member, Enrollment)>, now: DateTime<Utc>) -> Vec<MemberRow> {
        let units: BTreeSet<UnitId> = pairs.iter().map(|(_, e)| e.unit_id.clone()).collect();
        let permits = self.fetch_permits();
        let (catalog, outcomes) = tokio::join!(
            self.lookup_units(units, &permits),
            self.fetch_progress(&pairs, &permits)
        );

        pairs
            .iter()
            .zip(outcomes)
            .map(|((member, enrollment), outcome)| {
                let unit = catalog
                    .get(&enrollment.unit_id)
                    .cloned()
                    .unwrap_or_else(|| UnitInfo::unknown(&enrollment.unit_id));
                self.build_row(member, enrollment, unit, outcome, now)
            })
            .collect()
    }

    /// Shared bound for every outbound fetch of one request.
    fn fetch_permits(&self) -> Arc<Semaphore> {
        Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)))
    }

    /// Catalog entries for `units`, fetched concurrently. Unknown units and
    /// failed lookups fall back to [`UnitInfo::unknown`].
    async fn lookup_units(&self, units: BTreeSet<UnitId>, permits: &Arc<Semaphore>) -> HashMap<UnitId, UnitInfo> {
        let deadline = self.config.fetch_timeout;
        let mut set = JoinSet::new();
        for unit_id in units {
            let catalog = Arc::clone(&self.catalog);
            let permits = Arc::clone(permits);
            set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    let info = UnitInfo::unknown(&unit_id);
                    return (unit_id, info);
                };
                let info = match tokio::time::timeout(deadline, catalog.unit(&unit_id)).await {
                    Ok(Ok(Some(info))) => info,
                    Ok(Ok(None)) => UnitInfo::unknown(&unit_id),
                    Ok(Err(e)) => {
                        warn!(unit_id = %unit_id, error = %e, "unit catalog lookup failed");
                        UnitInfo::unknown(&unit_id)
                    }
                    Err(_) => {
                        warn!(unit_id = %unit_id, "unit catalog lookup timed out");
                        UnitInfo::unknown(&unit_id)
                    }
                };
                (unit_id, info)
            });
        }

        let mut out = HashMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((unit_id, info)) => {
                    out.insert(unit_id, info);
                }
                Err(e) => warn!(error = %e, "unit catalog task failed"),
            }
        }
        out
    }

    /// One outcome per pair, in input order.
    async fn fetch_progress(&self, pairs: &[(Member, Enrollment)], permits: &Arc<Semaphore>) -> Vec<FetchOutcome> {
        let deadline = self.config.fetch_timeout;
        let mut set = JoinSet::new();

        // A slot whose task never reports back stays unavailable.
        let mut outcomes: Vec<FetchOutcome> = Vec::with_capacity(pairs.len());
        for (idx, (member, enrollment)) in pairs.iter().enumerate() {
            let Some(identity) = member.identity() else {
                outcomes.push(Ok(None));
                continue;
            };
            outcomes.push(Err(FetchError::Unavailable("fetch did not complete".to_string())));

            let progress = Arc::clone(&self.progress);
            let permits = Arc::clone(permits);
            let unit_id = enrollment.unit_id.clone();
            set.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (idx, Err(FetchError::Unavailable("fetch pool closed".to_string())));
                };
                let outcome = match tokio::time::timeout(deadline, progress.fetch(identity, &unit_id)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout),
                };
                (idx, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = outcome,
                Err(e) => warn!(error = %e, "progress fetch task failed"),
            }
        }
        outcomes
    }

    fn build_row(
        &self,
        member: &Member,
        enrollment: &Enrollment,
        unit: UnitInfo,
        outcome: FetchOutcome,
        now: DateTime<Utc>,
    ) -> MemberRow {
        let (record, data_unavailable) = match outcome {
            Ok(record) => (record, false),
            Err(e) => {
                warn!(
                    member_id = %member.id(),
                    unit_id = %enrollment.unit_id,
                    error = %e,
                    "progress unavailable; row degraded"
                );
                (None, true)
            }
        };
        let classification = Classification::of(record.as_ref(), enrollment.enrolled_at, now, self.config.stale_days);
        debug!(member_id = %member.id(), unit_id = %enrollment.unit_id, status = %classification.status, "classified");

        MemberRow {
            member_id: member.id(),
            display_name: member.display_name().to_string(),
            contact_address: member.contact().to_string(),
            job_title: member.job_title().map(str::to_string),
            unit_id: enrollment.unit_id.clone(),
            unit_title: unit.title,
            current_module: record.as_ref().and_then(|r| r.current_module.clone()),
            completed_units: record.as_ref().map_or(0, |r| r.completed_units),
            total_units: unit.total_units,
            progress_percent: classification.progress_percent,
            status: classification.status,
            last_activity_at: record.as_ref().and_then(|r| r.last_activity_at),
            enrolled_at: enrollment.enrolled_at,
            days_since_enrollment: classification.days_since_enrollment,
            data_unavailable,
        }
    }
}
