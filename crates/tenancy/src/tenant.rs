use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seatwise_core::{DomainError, TenantId};

/// Tenant status lifecycle. Tenants are never deleted, only suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
}

/// The purchasing organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    id: TenantId,
    name: String,
    status: TenantStatus,
    onboarded_at: DateTime<Utc>,
}

impl Tenant {
    /// Create a tenant at onboarding time.
    pub fn onboard(id: TenantId, name: impl Into<String>, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("tenant name cannot be empty"));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            status: TenantStatus::Active,
            onboarded_at: now,
        })
    }

    pub fn id(&self) -> TenantId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> TenantStatus {
        self.status
    }

    pub fn onboarded_at(&self) -> DateTime<Utc> {
        self.onboarded_at
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    pub fn suspend(&mut self) {
        self.status = TenantStatus::Suspended;
    }

    pub fn reactivate(&mut self) {
        self.status = TenantStatus::Active;
    }
}
