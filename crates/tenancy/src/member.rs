use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use seatwise_core::{DomainError, IdentityId, MemberId, TenantId, Versioned};

use crate::invite::{InviteError, InviteToken, PendingInvite};

/// Roster lifecycle.
///
/// `invited -> active` on acceptance, `active|invited -> deactivated` on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Invited,
    Active,
    Deactivated,
}

/// Input for adding a member to a tenant roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub contact: String,
    pub display_name: String,
    pub job_title: Option<String>,
}

/// A roster entry: someone who can hold seats within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    tenant_id: TenantId,
    contact: String,
    display_name: String,
    job_title: Option<String>,
    status: MemberStatus,
    invite: Option<PendingInvite>,
    identity: Option<IdentityId>,
    invited_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
    deactivated_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Member {
    /// Create an `invited` member holding a fresh token valid for `ttl`.
    pub fn invite(
        id: MemberId,
        tenant_id: TenantId,
        input: NewMember,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(Self, InviteToken), DomainError> {
        let contact = normalize_contact(&input.contact)?;

        let display_name = input.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }
        let job_title = input
            .job_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        ensure_positive_ttl(ttl)?;

        let token = InviteToken::generate();
        let member = Self {
            id,
            tenant_id,
            contact,
            display_name,
            job_title,
            status: MemberStatus::Invited,
            invite: Some(PendingInvite {
                token: token.clone(),
                expires_at: now + ttl,
            }),
            identity: None,
            invited_at: now,
            activated_at: None,
            deactivated_at: None,
            version: 0,
        };
        Ok((member, token))
    }

    /// Build an already-active member (fixtures, imports of linked accounts).
    pub fn active(
        id: MemberId,
        tenant_id: TenantId,
        input: NewMember,
        identity: IdentityId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let (mut member, token) = Self::invite(id, tenant_id, input, Duration::days(1), now)?;
        member.accept(&token, identity, None, now).map_err(|e| DomainError::invariant(e.to_string()))?;
        member.version = 0;
        Ok(member)
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn job_title(&self) -> Option<&str> {
        self.job_title.as_deref()
    }

    pub fn status(&self) -> MemberStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn identity(&self) -> Option<IdentityId> {
        self.identity
    }

    pub fn invite_expires_at(&self) -> Option<DateTime<Utc>> {
        self.invite.as_ref().map(|i| i.expires_at)
    }

    pub fn invited_at(&self) -> DateTime<Utc> {
        self.invited_at
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    pub fn deactivated_at(&self) -> Option<DateTime<Utc>> {
        self.deactivated_at
    }

    /// Current invite token; `None` unless the member is `invited`.
    pub fn invite_token(&self) -> Option<&InviteToken> {
        self.invite.as_ref().map(|i| &i.token)
    }

    /// Whether `token` is this member's current invite token.
    pub fn holds_token(&self, token: &InviteToken) -> bool {
        self.invite.as_ref().is_some_and(|i| &i.token == token)
    }

    /// Whether `token` could be accepted at `now`, without accepting it.
    pub fn check_invite(&self, token: &InviteToken, now: DateTime<Utc>) -> Result<(), InviteError> {
        match self.status {
            MemberStatus::Invited => {}
            MemberStatus::Active => return Err(InviteError::AlreadyUsed),
            MemberStatus::Deactivated => return Err(InviteError::NotInvited),
        }

        let invite = self.invite.as_ref().ok_or(InviteError::NotInvited)?;
        if &invite.token != token {
            return Err(InviteError::TokenMismatch);
        }
        if invite.is_expired(now) {
            return Err(InviteError::Expired);
        }
        Ok(())
    }

    /// Accept the pending invite and link the member to `identity`.
    ///
    /// When the identity provider supplies an email it must match the invited
    /// contact address (case-insensitive).
    pub fn accept(
        &mut self,
        token: &InviteToken,
        identity: IdentityId,
        identity_email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), InviteError> {
        self.check_invite(token, now)?;
        if let Some(email) = identity_email {
            if email.trim().to_lowercase() != self.contact {
                return Err(InviteError::EmailMismatch);
            }
        }

        self.status = MemberStatus::Active;
        self.identity = Some(identity);
        self.invite = None;
        self.activated_at = Some(now);
        self.version += 1;
        Ok(())
    }

    /// Replace the pending invite with a fresh token. The previous token stops
    /// matching immediately.
    pub fn reissue_invite(&mut self, ttl: Duration, now: DateTime<Utc>) -> Result<InviteToken, DomainError> {
        if self.status != MemberStatus::Invited {
            return Err(DomainError::conflict("only invited members can receive a new invite"));
        }
        ensure_positive_ttl(ttl)?;

        let token = InviteToken::generate();
        self.invite = Some(PendingInvite {
            token: token.clone(),
            expires_at: now + ttl,
        });
        self.version += 1;
        Ok(token)
    }

    /// Remove the member from the roster. Returns `false` when already deactivated.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == MemberStatus::Deactivated {
            return false;
        }
        self.status = MemberStatus::Deactivated;
        self.invite = None;
        self.deactivated_at = Some(now);
        self.version += 1;
        true
    }
}

impl Versioned for Member {
    fn version(&self) -> u64 {
        self.version
    }
}

fn ensure_positive_ttl(ttl: Duration) -> Result<(), DomainError> {
    if ttl <= Duration::zero() {
        return Err(DomainError::validation("invite lifetime must be positive"));
    }
    Ok(())
}

/// Lower-case and shape-check a contact address.
pub fn normalize_contact(raw: &str) -> Result<String, DomainError> {
    let contact = raw.trim().to_lowercase();
    let Some((local, domain)) = contact.split_once('@') else {
        return Err(DomainError::validation("contact address must contain '@'"));
    };
    let well_formed = !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !contact.chars().any(char::is_whitespace);
    if !well_formed {
        return Err(DomainError::validation(format!("invalid contact address: {contact}")));
    }
    Ok(contact)
}
