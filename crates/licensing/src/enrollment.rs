use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seatwise_core::{EnrollmentId, MemberId, TenantId, UnitId};

/// One member bound to one seat of a `(tenant, unit)` pool.
///
/// At most one enrollment exists per `(tenant, unit, member)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub tenant_id: TenantId,
    pub unit_id: UnitId,
    pub member_id: MemberId,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(tenant_id: TenantId, unit_id: UnitId, member_id: MemberId, now: DateTime<Utc>) -> Self {
        Self {
            id: EnrollmentId::new(),
            tenant_id,
            unit_id,
            member_id,
            enrolled_at: now,
        }
    }

    /// Whole days elapsed since enrollment, never negative.
    pub fn days_since_enrollment(&self, now: DateTime<Utc>) -> i64 {
        (now - self.enrolled_at).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn days_since_enrollment_floors_and_clamps() {
        let now = Utc::now();
        let e = Enrollment::new(TenantId::new(), UnitId::new("u1").unwrap(), MemberId::new(), now);
        assert_eq!(e.days_since_enrollment(now + Duration::hours(47)), 1);
        assert_eq!(e.days_since_enrollment(now - Duration::days(3)), 0);
    }

    #[test]
    fn serializes_camel_case() {
        let e = Enrollment::new(TenantId::new(), UnitId::new("u1").unwrap(), MemberId::new(), Utc::now());
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["unitId"], "u1");
        assert!(v.get("enrolledAt").is_some());
    }
}
