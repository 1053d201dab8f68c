//! Tenant, admin and roster records.
//!
//! Admin lookups go through [`seatwise_auth::AdminDirectory`]; roster reads and
//! writes go through [`MemberDirectory`]. Writes are compare-and-swap on the
//! member version.

pub mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use seatwise_auth::DirectoryError;
use seatwise_core::{ExpectedVersion, MemberId, TenantId};
use seatwise_tenancy::{InviteToken, Member};

pub use in_memory::InMemoryDirectory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemberWriteError {
    #[error("a member with contact address {0} already exists")]
    DuplicateContact(String),

    #[error("member was modified concurrently")]
    VersionConflict,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn member(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<Option<Member>, DirectoryError>;

    /// Members in `active` status, ordered by member id.
    async fn active_members(&self, tenant_id: TenantId) -> Result<Vec<Member>, DirectoryError>;

    /// The invited member currently holding `token`, across all tenants.
    async fn find_by_invite(&self, token: &InviteToken) -> Result<Option<Member>, DirectoryError>;

    /// Insert a new member. Contact addresses are unique per tenant.
    async fn insert_member(&self, member: Member) -> Result<(), MemberWriteError>;

    /// Replace a member if the stored version still matches `expected`.
    async fn save_member(
        &self,
        member: Member,
        expected: ExpectedVersion,
    ) -> Result<(), MemberWriteError>;
}

#[async_trait]
impl<D> MemberDirectory for Arc<D>
where
    D: MemberDirectory + ?Sized,
{
    async fn member(
        &self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<Option<Member>, DirectoryError> {
        (**self).member(tenant_id, member_id).await
    }

    async fn active_members(&self, tenant_id: TenantId) -> Result<Vec<Member>, DirectoryError> {
        (**self).active_members(tenant_id).await
    }

    async fn find_by_invite(&self, token: &InviteToken) -> Result<Option<Member>, DirectoryError> {
        (**self).find_by_invite(token).await
    }

    async fn insert_member(&self, member: Member) -> Result<(), MemberWriteError> {
        (**self).insert_member(member).await
    }

    async fn save_member(
        &self,
        member: Member,
        expected: ExpectedVersion,
    ) -> Result<(), MemberWriteError> {
        (**self).save_member(member, expected).await
    }
}
