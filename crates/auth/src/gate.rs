//! Identity Gate: the first check of every tenant-scoped operation.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use seatwise_core::{IdentityId, TenantId};

use crate::directory::{AdminDirectory, AdminGrant, DirectoryError};
use crate::Permission;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The caller holds no admin record for the tenant.
    #[error("permission denied")]
    NotAnAdmin,

    #[error("tenant not found")]
    TenantNotFound,

    #[error("tenant is suspended")]
    TenantSuspended,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Proof that `identity` administers `tenant_id`. Only [`IdentityGate`]
/// constructs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    tenant_id: TenantId,
    identity: IdentityId,
    grant: AdminGrant,
}

impl AdminContext {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn identity(&self) -> IdentityId {
        self.identity
    }

    pub fn grant(&self) -> &AdminGrant {
        &self.grant
    }

    pub fn require(&self, permission: &Permission) -> Result<(), AuthzError> {
        if self.grant.grants(permission) {
            Ok(())
        } else {
            warn!(
                target: "security",
                tenant_id = %self.tenant_id,
                identity = %self.identity,
                permission = %permission,
                "admin lacks required permission"
            );
            Err(AuthzError::Forbidden(permission.clone()))
        }
    }
}

#[derive(Clone)]
pub struct IdentityGate {
    directory: Arc<dyn AdminDirectory>,
}

impl IdentityGate {
    pub fn new(directory: Arc<dyn AdminDirectory>) -> Self {
        Self { directory }
    }

    /// Resolve the caller's admin record for `tenant_id`.
    ///
    /// The admin record is checked before the tenant so a non-admin cannot test
    /// which tenants exist.
    pub async fn authorize(
        &self,
        tenant_id: TenantId,
        caller: IdentityId,
    ) -> Result<AdminContext, AuthzError> {
        let Some(grant) = self.directory.admin(tenant_id, caller).await? else {
            warn!(
                target: "security",
                tenant_id = %tenant_id,
                identity = %caller,
                "admin check denied"
            );
            return Err(AuthzError::NotAnAdmin);
        };

        let tenant = self
            .directory
            .tenant(tenant_id)
            .await?
            .ok_or(AuthzError::TenantNotFound)?;
        if !tenant.is_active() {
            return Err(AuthzError::TenantSuspended);
        }

        Ok(AdminContext {
            tenant_id,
            identity: caller,
            grant,
        })
    }

    /// [`authorize`](Self::authorize) followed by a permission check.
    pub async fn authorize_for(
        &self,
        tenant_id: TenantId,
        caller: IdentityId,
        permission: &Permission,
    ) -> Result<AdminContext, AuthzError> {
        let ctx = self.authorize(tenant_id, caller).await?;
        ctx.require(permission)?;
        Ok(ctx)
    }
}
