use serde::{Deserialize, Serialize};

use seatwise_core::{DomainError, TenantId, UnitId, Versioned};

use crate::error::{LicensingError, LicensingResult};

/// Purchased seat capacity for one licensed unit within a tenant.
///
/// `0 <= used <= total` holds for every value of this type; `available` is
/// derived and never stored. Every mutation bumps `version`, which stores use
/// for compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPool {
    tenant_id: TenantId,
    unit_id: UnitId,
    total: u32,
    used: u32,
    version: u64,
}

/// Read-only snapshot of a pool's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub unit_id: UnitId,
    pub total: u32,
    pub used: u32,
    pub available: u32,
}

impl SeatPool {
    /// Open a pool with its first purchase.
    pub fn open(tenant_id: TenantId, unit_id: UnitId, seats: u32) -> Result<Self, DomainError> {
        ensure_seats(seats)?;
        Ok(Self {
            tenant_id,
            unit_id,
            total: seats,
            used: 0,
            version: 1,
        })
    }

    /// Rebuild a pool from persisted counters, rejecting impossible states.
    pub fn restore(
        tenant_id: TenantId,
        unit_id: UnitId,
        total: u32,
        used: u32,
        version: u64,
    ) -> Result<Self, DomainError> {
        if used > total {
            return Err(DomainError::invariant(format!(
                "seat pool {unit_id} has used {used} > total {total}"
            )));
        }
        Ok(Self {
            tenant_id,
            unit_id,
            total,
            used,
            version,
        })
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn available(&self) -> u32 {
        self.total - self.used
    }

    pub fn is_full(&self) -> bool {
        self.used >= self.total
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            unit_id: self.unit_id.clone(),
            total: self.total,
            used: self.used,
            available: self.available(),
        }
    }

    /// Consume one seat.
    pub fn allocate_one(&mut self) -> LicensingResult<()> {
        if self.is_full() {
            return Err(LicensingError::SeatsExhausted {
                tenant_id: self.tenant_id,
                unit_id: self.unit_id.clone(),
            });
        }
        self.used += 1;
        self.version += 1;
        Ok(())
    }

    /// Return one seat to the pool.
    pub fn release_one(&mut self) -> Result<(), DomainError> {
        if self.used == 0 {
            return Err(DomainError::invariant(format!(
                "seat pool {} has no seats in use",
                self.unit_id
            )));
        }
        self.used -= 1;
        self.version += 1;
        Ok(())
    }

    /// Increase capacity after a purchase. Capacity never decreases.
    pub fn add_seats(&mut self, seats: u32) -> Result<(), DomainError> {
        ensure_seats(seats)?;
        self.total = self
            .total
            .checked_add(seats)
            .ok_or_else(|| DomainError::validation("seat total overflow"))?;
        self.version += 1;
        Ok(())
    }
}

impl Versioned for SeatPool {
    fn version(&self) -> u64 {
        self.version
    }
}

fn ensure_seats(seats: u32) -> Result<(), DomainError> {
    if seats == 0 {
        return Err(DomainError::validation("seat count must be positive"));
    }
    Ok(())
}
