use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use seatwise_auth::{AdminDirectory, AdminGrant, DirectoryError};
use seatwise_core::{ExpectedVersion, IdentityId, MemberId, TenantId, Versioned};
use seatwise_tenancy::{InviteToken, Member, Tenant};

use crate::read_model::{InMemoryTenantStore, TenantStore};

use super::{MemberDirectory, MemberWriteError};

/// In-memory tenants, admins and roster for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    admins: InMemoryTenantStore<IdentityId, AdminGrant>,
    members: InMemoryTenantStore<MemberId, Member>,
    invites: RwLock<HashMap<InviteToken, (TenantId, MemberId)>>,
    // Serializes roster writes so uniqueness and version checks see a stable view.
    write_lock: Mutex<()>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_tenant(&self, tenant: Tenant) {
        if let Ok(mut map) = self.tenants.write() {
            map.insert(tenant.id(), tenant);
        }
    }

    pub fn grant_admin(&self, grant: AdminGrant) {
        self.admins.upsert(grant.tenant_id, grant.identity, grant);
    }

    pub fn revoke_admin(&self, tenant_id: TenantId, identity: IdentityId) -> bool {
        self.admins.remove(tenant_id, &identity).is_some()
    }

    fn reindex_invite(&self, previous: Option<&Member>, current: &Member) -> Result<(), DirectoryError> {
        let mut index = self.invites.write().map_err(|_| poisoned())?;
        if let Some(token) = previous.and_then(Member::invite_token) {
            index.remove(token);
        }
        if let Some(token) = current.invite_token() {
            index.insert(token.clone(), (current.tenant_id(), current.id()));
        }
        Ok(())
    }
}

fn poisoned() -> DirectoryError {
    DirectoryError("lock poisoned".to_string())
}

#[async_trait]
impl AdminDirectory for InMemoryDirectory {
    async fn tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        let map = self.tenants.read().map_err(|_| poisoned())?;
        Ok(map.get(&tenant_id).cloned())
    }

    async fn admin(
        &self,
        tenant_id: TenantId,
        identity: IdentityId,
    ) -> Result<Option<AdminGrant>, DirectoryError> {
        Ok(self.admins.get(tenant_id, &identity))
    }
}

#[async_trait]
impl MemberDirectory for InMemoryDirectory {
    async fn member(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<Option<Member>, DirectoryError> {
        Ok(self.members.get(tenant_id, &member_id))
    }

    async fn active_members(&self, tenant_id: TenantId) -> Result<Vec<Member>, DirectoryError> {
        let mut members: Vec<Member> = self
            .members
            .list(tenant_id)
            .into_iter()
            .filter(Member::is_active)
            .collect();
        members.sort_by_key(Member::id);
        Ok(members)
    }

    async fn find_by_invite(&self, token: &InviteToken) -> Result<Option<Member>, DirectoryError> {
        let location = {
            let index = self.invites.read().map_err(|_| poisoned())?;
            index.get(token).copied()
        };
        Ok(location
            .and_then(|(tenant_id, member_id)| self.members.get(tenant_id, &member_id))
            .filter(|m| m.holds_token(token)))
    }

    async fn insert_member(&self, member: Member) -> Result<(), MemberWriteError> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let tenant_id = member.tenant_id();
        if self.members.get(tenant_id, &member.id()).is_some() {
            return Err(MemberWriteError::VersionConflict);
        }
        let contact = member.contact().to_string();
        if self.members.find(tenant_id, &|m: &Member| m.contact() == contact).is_some() {
            return Err(MemberWriteError::DuplicateContact(contact));
        }

        self.reindex_invite(None, &member)?;
        self.members.upsert(tenant_id, member.id(), member);
        Ok(())
    }

    async fn save_member(
        &self,
        member: Member,
        expected: ExpectedVersion,
    ) -> Result<(), MemberWriteError> {
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;

        let tenant_id = member.tenant_id();
        let previous = self.members.get(tenant_id, &member.id());
        if !expected.matches(previous.as_ref().map(Versioned::version)) {
            return Err(MemberWriteError::VersionConflict);
        }

        self.reindex_invite(previous.as_ref(), &member)?;
        self.members.upsert(tenant_id, member.id(), member);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use seatwise_tenancy::NewMember;

    use super::*;

    fn invite(tenant_id: TenantId, contact: &str) -> (Member, InviteToken) {
        Member::invite(
            MemberId::new(),
            tenant_id,
            NewMember {
                contact: contact.to_string(),
                display_name: "Member".to_string(),
                job_title: None,
            },
            Duration::days(7),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn contact_addresses_are_unique_per_tenant() {
        let dir = InMemoryDirectory::new();
        let t1 = TenantId::new();
        let t2 = TenantId::new();

        dir.insert_member(invite(t1, "a@x.io").0).await.unwrap();
        let err = dir.insert_member(invite(t1, "A@X.io").0).await.unwrap_err();
        assert_eq!(err, MemberWriteError::DuplicateContact("a@x.io".to_string()));
        dir.insert_member(invite(t2, "a@x.io").0).await.unwrap();
    }

    #[tokio::test]
    async fn invite_index_follows_token_changes() {
        let dir = InMemoryDirectory::new();
        let tenant_id = TenantId::new();
        let (member, old) = invite(tenant_id, "a@x.io");
        dir.insert_member(member.clone()).await.unwrap();
        assert_eq!(dir.find_by_invite(&old).await.unwrap().map(|m| m.id()), Some(member.id()));

        let mut updated = member.clone();
        let fresh = updated.reissue_invite(Duration::days(7), Utc::now()).unwrap();
        dir.save_member(updated, ExpectedVersion::of(&member)).await.unwrap();

        assert!(dir.find_by_invite(&old).await.unwrap().is_none());
        assert!(dir.find_by_invite(&fresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_saves_are_rejected() {
        let dir = InMemoryDirectory::new();
        let (member, _) = invite(TenantId::new(), "a@x.io");
        dir.insert_member(member.clone()).await.unwrap();

        let mut first = member.clone();
        first.deactivate(Utc::now());
        dir.save_member(first, ExpectedVersion::of(&member)).await.unwrap();

        let mut second = member.clone();
        second.deactivate(Utc::now());
        assert_eq!(
            dir.save_member(second, ExpectedVersion::of(&member)).await,
            Err(MemberWriteError::VersionConflict)
        );
    }

    #[tokio::test]
    async fn admin_lookup_is_tenant_scoped() {
        let dir = InMemoryDirectory::new();
        let t1 = TenantId::new();
        let who = IdentityId::new();
        dir.grant_admin(AdminGrant::owner(t1, who));
        assert!(dir.admin(t1, who).await.unwrap().is_some());
        assert!(dir.admin(TenantId::new(), who).await.unwrap().is_none());
        assert!(dir.revoke_admin(t1, who));
        assert!(dir.admin(t1, who).await.unwrap().is_none());
    }
}
