//! Roster: invite, accept, reissue and deactivate tenant members.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use seatwise_auth::{AdminContext, AdminDirectory, AuthzError, DirectoryError, Permission};
use seatwise_core::{Clock, DomainError, ExpectedVersion, IdentityId, MemberId, TenantId};
use seatwise_licensing::LicensingError;
use seatwise_tenancy::{InviteError, InviteToken, Member, NewMember};

use crate::directory::{MemberDirectory, MemberWriteError};
use crate::seat_ledger::SeatLedger;

const SAVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Invite(#[from] InviteError),

    #[error("member {member_id} not found in tenant {tenant_id}")]
    MemberNotFound { tenant_id: TenantId, member_id: MemberId },

    #[error("invite not found")]
    InviteNotFound,

    #[error("a member with contact address {0} already exists")]
    DuplicateContact(String),

    #[error("member was modified concurrently")]
    Conflict,

    #[error(transparent)]
    Licensing(#[from] LicensingError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<MemberWriteError> for RosterError {
    fn from(e: MemberWriteError) -> Self {
        match e {
            MemberWriteError::DuplicateContact(contact) => RosterError::DuplicateContact(contact),
            MemberWriteError::VersionConflict => RosterError::Conflict,
            MemberWriteError::Directory(e) => RosterError::Directory(e),
        }
    }
}

/// What an invitee sees before accepting: who invited them and as whom.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreview {
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub member_id: MemberId,
    pub display_name: String,
    pub contact_address: String,
    pub job_title: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct Roster {
    members: Arc<dyn MemberDirectory>,
    tenants: Arc<dyn AdminDirectory>,
    ledger: Arc<SeatLedger>,
    clock: Arc<dyn Clock>,
    invite_ttl: Duration,
}

impl Roster {
    pub fn new(
        members: Arc<dyn MemberDirectory>,
        tenants: Arc<dyn AdminDirectory>,
        ledger: Arc<SeatLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            members,
            tenants,
            ledger,
            clock,
            invite_ttl: Duration::days(7),
        }
    }

    pub fn with_invite_ttl(mut self, ttl: Duration) -> Self {
        self.invite_ttl = ttl;
        self
    }

    /// Invite a new member. The token is returned once and never logged.
    #[instrument(skip_all, fields(tenant_id = %ctx.tenant_id()), err)]
    pub async fn add_member(&self, ctx: &AdminContext, input: NewMember) -> Result<(Member, InviteToken), RosterError> {
        ctx.require(&Permission::MANAGE_MEMBERS)?;
        let (member, token) = Member::invite(MemberId::new(), ctx.tenant_id(), input, self.invite_ttl, self.clock.now())?;
        self.members.insert_member(member.clone()).await?;
        info!(tenant_id = %ctx.tenant_id(), member_id = %member.id(), "member invited");
        Ok((member, token))
    }

    /// Look up a pending invite without consuming it.
    ///
    /// Unknown and consumed tokens are `InviteNotFound`; a token past its
    /// expiry is `Invite(Expired)`.
    #[instrument(skip_all, err)]
    pub async fn verify_invite(&self, token: &InviteToken) -> Result<InvitePreview, RosterError> {
        let member = self
            .members
            .find_by_invite(token)
            .await?
            .ok_or(RosterError::InviteNotFound)?;
        member.check_invite(token, self.clock.now())?;

        let tenant = self
            .tenants
            .tenant(member.tenant_id())
            .await?
            .ok_or(RosterError::InviteNotFound)?;

        Ok(InvitePreview {
            tenant_id: tenant.id(),
            tenant_name: tenant.name().to_string(),
            member_id: member.id(),
            display_name: member.display_name().to_string(),
            contact_address: member.contact().to_string(),
            job_title: member.job_title().map(str::to_string),
            expires_at: member.invite_expires_at(),
        })
    }

    /// Link `identity` to the invited member holding `token`.
    #[instrument(skip_all, fields(identity = %identity), err)]
    pub async fn accept_invite(
        &self,
        token: &InviteToken,
        identity: IdentityId,
        identity_email: Option<&str>,
    ) -> Result<Member, RosterError> {
        let current = self
            .members
            .find_by_invite(token)
            .await?
            .ok_or(RosterError::InviteNotFound)?;

        let mut accepted = current.clone();
        accepted.accept(token, identity, identity_email, self.clock.now())?;
        self.members
            .save_member(accepted.clone(), ExpectedVersion::of(&current))
            .await?;

        info!(
            tenant_id = %accepted.tenant_id(),
            member_id = %accepted.id(),
            "invite accepted"
        );
        Ok(accepted)
    }

    #[instrument(skip_all, fields(tenant_id = %ctx.tenant_id(), member_id = %member_id), err)]
    pub async fn reissue_invite(
        &self,
        ctx: &AdminContext,
        member_id: MemberId,
    ) -> Result<(Member, InviteToken), RosterError> {
        ctx.require(&Permission::MANAGE_MEMBERS)?;
        let current = self.require_member(ctx.tenant_id(), member_id).await?;

        let mut updated = current.clone();
        let token = updated.reissue_invite(self.invite_ttl, self.clock.now())?;
        self.members
            .save_member(updated.clone(), ExpectedVersion::of(&current))
            .await?;

        info!(tenant_id = %ctx.tenant_id(), member_id = %member_id, "invite reissued");
        Ok((updated, token))
    }

    /// Mark the member deactivated, then release every seat they hold.
    /// Deactivating twice is a no-op apart from releasing leftover seats.
    ///
    /// The status change lands first so a concurrent allocation either sees
    /// the deactivated member or has its seat released here.
    #[instrument(skip_all, fields(tenant_id = %ctx.tenant_id(), member_id = %member_id), err)]
    pub async fn deactivate_member(&self, ctx: &AdminContext, member_id: MemberId) -> Result<Member, RosterError> {
        ctx.require(&Permission::MANAGE_MEMBERS)?;
        let tenant_id = ctx.tenant_id();

        let member = self.mark_deactivated(tenant_id, member_id).await?;
        let released = self.ledger.release_all(ctx, member_id).await?;
        info!(tenant_id = %tenant_id, member_id = %member_id, released, "member deactivated");
        Ok(member)
    }

    async fn mark_deactivated(&self, tenant_id: TenantId, member_id: MemberId) -> Result<Member, RosterError> {
        for attempt in 1..=SAVE_ATTEMPTS {
            let current = self.require_member(tenant_id, member_id).await?;
            let mut updated = current.clone();
            if !updated.deactivate(self.clock.now()) {
                return Ok(current);
            }
            match self.members.save_member(updated.clone(), ExpectedVersion::of(&current)).await {
                Ok(()) => return Ok(updated),
                Err(MemberWriteError::VersionConflict) => {
                    warn!(attempt, "member deactivation lost compare-and-swap; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(RosterError::Conflict)
    }

    async fn require_member(&self, tenant_id: TenantId, member_id: MemberId) -> Result<Member, RosterError> {
        self.members
            .member(tenant_id, member_id)
            .await?
            .ok_or(RosterError::MemberNotFound { tenant_id, member_id })
    }
}
