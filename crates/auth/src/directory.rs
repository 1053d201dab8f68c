use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use seatwise_core::{IdentityId, TenantId};
use seatwise_tenancy::Tenant;

use crate::{Permission, Role};

/// An identity's administrator record within one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminGrant {
    pub tenant_id: TenantId,
    pub identity: IdentityId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl AdminGrant {
    pub fn owner(tenant_id: TenantId, identity: IdentityId) -> Self {
        Self {
            tenant_id,
            identity,
            roles: vec![Role::owner()],
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions(
        tenant_id: TenantId,
        identity: IdentityId,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            tenant_id,
            identity,
            roles: vec![Role::new("admin")],
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn is_owner(&self) -> bool {
        self.roles.iter().any(Role::is_owner)
    }

    pub fn grants(&self, required: &Permission) -> bool {
        self.is_owner()
            || self
                .permissions
                .iter()
                .any(|p| p.is_wildcard() || p == required)
    }

    /// Concrete permissions in effect (owner and wildcard expanded).
    pub fn effective_permissions(&self) -> Vec<Permission> {
        Permission::all()
            .into_iter()
            .filter(|p| self.grants(p))
            .collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("admin directory unavailable: {0}")]
pub struct DirectoryError(pub String);

/// Read access to tenants and their administrator sets.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError>;

    async fn admin(
        &self,
        tenant_id: TenantId,
        identity: IdentityId,
    ) -> Result<Option<AdminGrant>, DirectoryError>;
}

#[async_trait]
impl<D> AdminDirectory for Arc<D>
where
    D: AdminDirectory + ?Sized,
{
    async fn tenant(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DirectoryError> {
        (**self).tenant(tenant_id).await
    }

    async fn admin(
        &self,
        tenant_id: TenantId,
        identity: IdentityId,
    ) -> Result<Option<AdminGrant>, DirectoryError> {
        (**self).admin(tenant_id, identity).await
    }
}
