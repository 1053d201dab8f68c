use thiserror::Error;

use seatwise_auth::AuthzError;
use seatwise_core::{DomainError, MemberId, TenantId, UnitId};

pub type LicensingResult<T> = Result<T, LicensingError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LicensingError {
    #[error("no seats available for unit {unit_id} in tenant {tenant_id}")]
    SeatsExhausted { tenant_id: TenantId, unit_id: UnitId },

    /// Concurrent writers kept winning the compare-and-swap. Retryable.
    #[error("seat pool for unit {unit_id} is contended (gave up after {attempts} attempts)")]
    Contention {
        tenant_id: TenantId,
        unit_id: UnitId,
        attempts: u32,
    },

    #[error("member {member_id} is not active")]
    MemberNotActive { tenant_id: TenantId, member_id: MemberId },

    #[error("member {member_id} not found")]
    MemberNotFound { tenant_id: TenantId, member_id: MemberId },

    #[error("no seat pool for unit {unit_id}")]
    PoolNotFound { tenant_id: TenantId, unit_id: UnitId },

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("seat ledger store failure: {0}")]
    Store(String),
}

impl LicensingError {
    /// Only lost compare-and-swap races are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LicensingError::Contention { .. })
    }
}
