//! Aggregation Engine: joins roster, enrollments and external progress into the
//! administrator dashboard.

pub mod engine;

pub use engine::{DashboardEngine, DashboardError, EngineConfig, LicensedUnit, MemberDetail, MemberProfile};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Duration as Days;

    use seatwise_auth::{AdminGrant, AuthzError, Permission};
    use seatwise_core::{Clock, IdentityId, MemberId, UnitId};
    use seatwise_licensing::LicensingError;
    use seatwise_progress::{CSV_HEADER, FetchError, ProgressRecord, Status, UnitCatalog, UnitInfo};
    use seatwise_tenancy::Member;

    use crate::progress::{InMemoryProgressStore, InMemoryUnitCatalog};
    use crate::seat_ledger::SeatLedgerStore;
    use crate::test_support::Fixture;

    use super::*;

    struct Harness {
        fx: Fixture,
        progress: Arc<InMemoryProgressStore>,
        catalog: Arc<InMemoryUnitCatalog>,
        engine: DashboardEngine,
    }

    impl Harness {
        fn new(config: EngineConfig) -> Self {
            let fx = Fixture::new();
            let progress = Arc::new(InMemoryProgressStore::new());
            let catalog = Arc::new(InMemoryUnitCatalog::new());
            catalog.put(u1(), "Rust Foundations", 12);
            let engine = DashboardEngine::new(
                fx.gate.clone(),
                fx.directory.clone(),
                fx.ledger.clone(),
                progress.clone(),
                catalog.clone(),
                fx.clock.clone(),
            )
            .with_config(config);
            Self {
                fx,
                progress,
                catalog,
                engine,
            }
        }

        async fn enroll(&self, name: &str, unit: &UnitId) -> Member {
            let ctx = self.fx.owner_ctx().await;
            let member = self.fx.add_active_member(name).await;
            self.fx.ledger.allocate(&ctx, unit, member.id()).await.unwrap();
            member
        }

        fn record(&self, member: &Member, unit: &UnitId, progress: f64, idle_days: i64) {
            let last = self.fx.clock.now() - Days::days(idle_days);
            self.progress.put(
                member.identity().unwrap(),
                unit.clone(),
                ProgressRecord::new(progress, Some(last)),
            );
        }
    }

    fn u1() -> UnitId {
        UnitId::new("U1").unwrap()
    }

    fn u2() -> UnitId {
        UnitId::new("U2").unwrap()
    }

    #[tokio::test]
    async fn seats_progress_and_ranking_end_to_end() {
        let h = Harness::new(EngineConfig::default().with_stale_days(7));
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u1(), 2).await.unwrap();

        let a = h.enroll("A", &u1()).await;
        let b = h.enroll("B", &u1()).await;
        let c = h.fx.add_active_member("C").await;
        assert!(matches!(
            h.fx.ledger.allocate(&ctx, &u1(), c.id()).await,
            Err(LicensingError::SeatsExhausted { .. })
        ));

        h.record(&a, &u1(), 100.0, 0);
        h.record(&b, &u1(), 30.0, 10);

        let view = h.engine.build_dashboard(h.fx.tenant_id, h.fx.owner, None).await.unwrap();
        let order: Vec<MemberId> = view.rows.iter().map(|r| r.member_id).collect();
        assert_eq!(order, vec![b.id(), a.id()]);
        assert_eq!(view.rows[0].status, Status::AtRisk);
        assert_eq!(view.rows[1].status, Status::Completed);
        assert_eq!(view.rows[1].unit_title, "Rust Foundations");

        assert_eq!(view.summary.total_members, 3);
        assert_eq!(view.summary.completed_count, 1);
        assert_eq!(view.summary.at_risk_count, 1);
        assert_eq!(view.summary.active_members, 0);
        assert!((view.summary.average_progress - 65.0).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_fetch_degrades_only_its_row() {
        let h = Harness::new(
            EngineConfig::default()
                .with_fetch_timeout(Duration::from_millis(50))
                .with_max_concurrent_fetches(2),
        );
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u1(), 3).await.unwrap();

        let a = h.enroll("A", &u1()).await;
        let b = h.enroll("B", &u1()).await;
        let slow = h.enroll("Slow", &u1()).await;
        h.record(&a, &u1(), 40.0, 1);
        h.record(&b, &u1(), 60.0, 1);
        h.record(&slow, &u1(), 90.0, 1);
        h.progress
            .delay_for(slow.identity().unwrap(), u1(), Duration::from_millis(500));

        let view = h.engine.build_dashboard(h.fx.tenant_id, h.fx.owner, None).await.unwrap();
        assert_eq!(view.rows.len(), 3);

        let degraded: Vec<&_> = view.rows.iter().filter(|r| r.data_unavailable).collect();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].member_id, slow.id());
        assert_eq!(degraded[0].status, Status::NotStarted);
        assert_eq!(degraded[0].progress_percent, 0.0);

        assert_eq!(view.summary.active_members, 2);
        assert!((view.summary.average_progress - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_store_marks_row_unavailable() {
        let h = Harness::new(EngineConfig::default());
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u1(), 1).await.unwrap();
        let a = h.enroll("A", &u1()).await;
        h.progress.fail_for(a.identity().unwrap(), u1(), "connection reset");

        let view = h.engine.build_dashboard(h.fx.tenant_id, h.fx.owner, None).await.unwrap();
        assert!(view.rows[0].data_unavailable);
        assert_eq!(view.summary.average_progress, 0.0);
        assert_eq!(view.summary.total_members, 1);
    }

    #[tokio::test]
    async fn missing_record_is_not_started_and_available() {
        let h = Harness::new(EngineConfig::default());
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u1(), 1).await.unwrap();
        h.enroll("A", &u1()).await;

        let view = h.engine.build_dashboard(h.fx.tenant_id, h.fx.owner, None).await.unwrap();
        assert_eq!(view.rows[0].status, Status::NotStarted);
        assert!(!view.rows[0].data_unavailable);
        assert_eq!(view.rows[0].total_units, 12);
    }

    #[tokio::test]
    async fn unit_filter_and_unknown_catalog_entry() {
        let h = Harness::new(EngineConfig::default());
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u1(), 5).await.unwrap();
        h.fx.ledger.purchase(&ctx, &u2(), 5).await.unwrap();

        let a = h.enroll("A", &u1()).await;
        h.fx.ledger.allocate(&ctx, &u2(), a.id()).await.unwrap();
        h.enroll("B", &u1()).await;

        let all = h.engine.build_dashboard(h.fx.tenant_id, h.fx.owner, None).await.unwrap();
        assert_eq!(all.rows.len(), 3);

        let only_u2 = h
            .engine
            .build_dashboard(h.fx.tenant_id, h.fx.owner, Some(&u2()))
            .await
            .unwrap();
        assert_eq!(only_u2.rows.len(), 1);
        assert_eq!(only_u2.rows[0].unit_title, "U2");
        assert_eq!(only_u2.rows[0].total_units, 0);
        assert_eq!(only_u2.summary.total_members, 2);

        h.catalog.put(u2(), "Async in Depth", 8);
        let titled = h
            .engine
            .build_dashboard(h.fx.tenant_id, h.fx.owner, Some(&u2()))
            .await
            .unwrap();
        assert_eq!(titled.rows[0].unit_title, "Async in Depth");
    }

    #[tokio::test]
    async fn reports_need_view_permission() {
        let h = Harness::new(EngineConfig::default());
        let billing = IdentityId::new();
        h.fx.directory.grant_admin(AdminGrant::with_permissions(
            h.fx.tenant_id,
            billing,
            [Permission::MANAGE_BILLING],
        ));

        let err = h
            .engine
            .build_dashboard(h.fx.tenant_id, billing, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Authz(AuthzError::Forbidden(p)) if p == Permission::VIEW_REPORTS
        ));

        let stranger = h
            .engine
            .build_dashboard(h.fx.tenant_id, IdentityId::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(stranger, DashboardError::Authz(AuthzError::NotAnAdmin)));
    }

    #[tokio::test]
    async fn member_detail_lists_every_enrollment() {
        let h = Harness::new(EngineConfig::default());
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u1(), 2).await.unwrap();
        h.fx.ledger.purchase(&ctx, &u2(), 2).await.unwrap();
        let a = h.enroll("A", &u1()).await;
        h.fx.ledger.allocate(&ctx, &u2(), a.id()).await.unwrap();
        h.record(&a, &u2(), 100.0, 0);

        let detail = h.engine.member_detail(h.fx.tenant_id, h.fx.owner, a.id()).await.unwrap();
        assert_eq!(detail.member.member_id, a.id());
        assert_eq!(detail.member.contact_address, "a@example.com");
        let units: Vec<&str> = detail.enrollments.iter().map(|r| r.unit_id.as_str()).collect();
        assert_eq!(units, vec!["U1", "U2"]);

        assert!(matches!(
            h.engine.member_detail(h.fx.tenant_id, h.fx.owner, MemberId::new()).await,
            Err(DashboardError::MemberNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn csv_export_follows_dashboard_order() {
        let h = Harness::new(EngineConfig::default());
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u1(), 2).await.unwrap();
        let a = h.enroll("A", &u1()).await;
        let b = h.enroll("B", &u1()).await;
        h.record(&a, &u1(), 80.0, 0);
        h.record(&b, &u1(), 20.0, 0);

        let csv = h.engine.export_csv(h.fx.tenant_id, h.fx.owner, None).await.unwrap();
        let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert!(lines[1].starts_with("B,b@example.com"));
        assert!(lines[2].starts_with("A,a@example.com"));
    }

    #[tokio::test]
    async fn licensed_units_join_pools_with_the_catalog() {
        let h = Harness::new(EngineConfig::default());
        let ctx = h.fx.owner_ctx().await;
        h.fx.ledger.purchase(&ctx, &u2(), 1).await.unwrap();
        h.fx.ledger.purchase(&ctx, &u1(), 3).await.unwrap();
        h.enroll("A", &u1()).await;

        let units = h.engine.licensed_units(h.fx.tenant_id, h.fx.owner).await.unwrap();
        assert_eq!(units.len(), h.fx.store.list_pools(h.fx.tenant_id).await.unwrap().len());

        assert_eq!(units[0].unit_id, u1());
        assert_eq!(units[0].title, "Rust Foundations");
        assert_eq!(units[0].total_units, 12);
        assert_eq!((units[0].total_seats, units[0].used_seats, units[0].available_seats), (3, 1, 2));

        // No catalog entry for U2.
        assert_eq!(units[1].unit_id, u2());
        assert_eq!(units[1].title, "U2");
        assert_eq!(units[1].total_units, 0);

        let stranger = IdentityId::new();
        assert!(matches!(
            h.engine.licensed_units(h.fx.tenant_id, stranger).await,
            Err(DashboardError::Authz(AuthzError::NotAnAdmin))
        ));
    }

    /// Catalog that answers after `delay` and records peak concurrency.
    struct SlowCatalog {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl UnitCatalog for SlowCatalog {
        async fn unit(&self, unit_id: &UnitId) -> Result<Option<UnitInfo>, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(UnitInfo {
                unit_id: unit_id.clone(),
                title: format!("Title {unit_id}"),
                total_units: 4,
            }))
        }
    }

    #[tokio::test]
    async fn catalog_lookups_run_concurrently_within_the_fetch_bound() {
        let h = Harness::new(EngineConfig::default());
        let ctx = h.fx.owner_ctx().await;
        let units: Vec<UnitId> = (1..=4).map(|i| UnitId::new(format!("C{i}")).unwrap()).collect();
        for unit in &units {
            h.fx.ledger.purchase(&ctx, unit, 1).await.unwrap();
            h.enroll(&format!("m-{unit}"), unit).await;
        }

        let catalog = Arc::new(SlowCatalog {
            delay: Duration::from_millis(50),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let engine = DashboardEngine::new(
            h.fx.gate.clone(),
            h.fx.directory.clone(),
            h.fx.ledger.clone(),
            h.progress.clone(),
            catalog.clone(),
            h.fx.clock.clone(),
        )
        .with_config(
            EngineConfig::default()
                .with_max_concurrent_fetches(2)
                .with_fetch_timeout(Duration::from_secs(1)),
        );

        let view = engine.build_dashboard(h.fx.tenant_id, h.fx.owner, None).await.unwrap();
        assert_eq!(view.rows.len(), 4);
        assert!(view.rows.iter().all(|r| r.unit_title.starts_with("Title C")));
        assert_eq!(catalog.peak.load(Ordering::SeqCst), 2);
    }
}
