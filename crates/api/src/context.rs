use seatwise_core::IdentityId;

/// Authenticated caller for a request (verified token subject).
///
/// Tenant scope is not part of the token: every tenant route names its tenant
/// in the path and the Identity Gate checks the caller against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    identity: IdentityId,
    email: Option<String>,
}

impl PrincipalContext {
    pub fn new(identity: IdentityId, email: Option<String>) -> Self {
        Self { identity, email }
    }

    pub fn identity(&self) -> IdentityId {
        self.identity
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
