use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Single-use secret that links a roster entry to an identity.
///
/// 256 bits of randomness rendered as 64 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteToken(String);

impl InviteToken {
    pub fn generate() -> Self {
        let hi = Uuid::new_v4().simple().to_string();
        let lo = Uuid::new_v4().simple().to_string();
        Self(format!("{hi}{lo}"))
    }

    /// Wrap a token received from a caller. No shape validation: an unknown
    /// token simply matches nothing.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are secrets; keep them out of logs.
impl core::fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("InviteToken(..)")
    }
}

/// Pending invite held by an `invited` member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvite {
    pub token: InviteToken,
    pub expires_at: DateTime<Utc>,
}

impl PendingInvite {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InviteError {
    #[error("invite token does not match")]
    TokenMismatch,

    #[error("invite has expired")]
    Expired,

    #[error("invite has already been used")]
    AlreadyUsed,

    #[error("member is not awaiting an invite")]
    NotInvited,

    #[error("email does not match the invited address")]
    EmailMismatch,
}
