//! Shared fixtures for infra tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use seatwise_auth::{AdminContext, AdminGrant, IdentityGate};
use seatwise_core::{Clock, FixedClock, IdentityId, MemberId, TenantId};
use seatwise_tenancy::{Member, NewMember, Tenant};

use crate::directory::{InMemoryDirectory, MemberDirectory};
use crate::seat_ledger::{InMemorySeatLedgerStore, SeatLedger};

pub struct Fixture {
    pub directory: Arc<InMemoryDirectory>,
    pub gate: IdentityGate,
    pub clock: Arc<FixedClock>,
    pub store: Arc<InMemorySeatLedgerStore>,
    pub ledger: Arc<SeatLedger>,
    pub tenant_id: TenantId,
    pub owner: IdentityId,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()));
        let directory = Arc::new(InMemoryDirectory::new());
        let tenant_id = TenantId::new();
        let owner = IdentityId::new();
        directory.upsert_tenant(Tenant::onboard(tenant_id, "Acme", clock.now()).unwrap());
        directory.grant_admin(AdminGrant::owner(tenant_id, owner));

        let store = Arc::new(InMemorySeatLedgerStore::new());
        let ledger = Arc::new(SeatLedger::new(store.clone(), directory.clone(), clock.clone()));
        Self {
            gate: IdentityGate::new(directory.clone()),
            directory,
            clock,
            store,
            ledger,
            tenant_id,
            owner,
        }
    }

    pub async fn owner_ctx(&self) -> AdminContext {
        self.gate.authorize(self.tenant_id, self.owner).await.unwrap()
    }

    pub async fn add_active_member(&self, name: &str) -> Member {
        let member = Member::active(
            MemberId::new(),
            self.tenant_id,
            NewMember {
                contact: format!("{}@example.com", name.to_lowercase()),
                display_name: name.to_string(),
                job_title: None,
            },
            IdentityId::new(),
            self.clock.now(),
        )
        .unwrap();
        self.directory.insert_member(member.clone()).await.unwrap();
        member
    }
}
