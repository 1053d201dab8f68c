//! Service wiring: stores, ledger, roster and dashboard engine.

use std::sync::Arc;

use tracing::info;

use seatwise_auth::IdentityGate;
use seatwise_core::{Clock, SystemClock};
use seatwise_infra::{
    aggregation::DashboardEngine,
    config::ServiceConfig,
    directory::InMemoryDirectory,
    progress::{InMemoryProgressStore, InMemoryUnitCatalog},
    roster::Roster,
    seat_ledger::{InMemorySeatLedgerStore, PostgresSeatLedgerStore, SeatLedger, SeatLedgerStore},
};

/// Everything request handlers need, shared behind one `Arc`.
///
/// Tenant/admin records, progress and the unit catalog are owned by external
/// systems; the in-memory adapters stand in for them and are exposed so
/// callers (and tests) can seed them.
pub struct AppServices {
    pub config: ServiceConfig,
    pub clock: Arc<dyn Clock>,
    pub directory: Arc<InMemoryDirectory>,
    pub progress: Arc<InMemoryProgressStore>,
    pub catalog: Arc<InMemoryUnitCatalog>,
    pub gate: IdentityGate,
    pub ledger: Arc<SeatLedger>,
    pub roster: Roster,
    pub dashboard: DashboardEngine,
}

impl AppServices {
    /// Fully in-memory wiring.
    pub fn in_memory(config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        Self::assemble(config, Arc::new(InMemorySeatLedgerStore::new()), clock)
    }

    pub fn assemble(config: ServiceConfig, store: Arc<dyn SeatLedgerStore>, clock: Arc<dyn Clock>) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let progress = Arc::new(InMemoryProgressStore::new());
        let catalog = Arc::new(InMemoryUnitCatalog::new());
        let gate = IdentityGate::new(directory.clone());

        let ledger = Arc::new(
            SeatLedger::new(store, directory.clone(), clock.clone()).with_retry_policy(config.retry_policy()),
        );
        let roster = Roster::new(directory.clone(), directory.clone(), ledger.clone(), clock.clone())
            .with_invite_ttl(config.invite_ttl());
        let dashboard = DashboardEngine::new(
            gate.clone(),
            directory.clone(),
            ledger.clone(),
            progress.clone(),
            catalog.clone(),
            clock.clone(),
        )
        .with_config(config.engine());

        Self {
            config,
            clock,
            directory,
            progress,
            catalog,
            gate,
            ledger,
            roster,
            dashboard,
        }
    }
}

/// Build services from configuration: Postgres seat ledger when
/// `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: ServiceConfig) -> anyhow::Result<AppServices> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn SeatLedgerStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pg = PostgresSeatLedgerStore::connect(url).await?;
            pg.migrate().await?;
            info!("seat ledger: postgres");
            Arc::new(pg)
        }
        None => {
            info!("seat ledger: in-memory (DATABASE_URL not set)");
            Arc::new(InMemorySeatLedgerStore::new())
        }
    };

    Ok(AppServices::assemble(config, store, clock))
}
