//! Versioned records and optimistic concurrency checks.

use crate::error::{DomainError, DomainResult};

/// A record whose mutations are guarded by a monotonically increasing version.
///
/// Stores compare the version they loaded against the version currently
/// persisted; a mismatch means another writer committed in between.
pub trait Versioned {
    /// Monotonically increasing version of the record's state.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a versioned record.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The record must not exist yet.
    Absent,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expect whatever version `record` was loaded at.
    pub fn of<V: Versioned>(record: &V) -> Self {
        ExpectedVersion::Exact(record.version())
    }

    /// `actual` is `None` when the record does not exist.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Absent, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec(u64);

    impl Versioned for Rec {
        fn version(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn exact_matches_only_same_version() {
        let expected = ExpectedVersion::of(&Rec(3));
        assert!(expected.matches(Some(3)));
        assert!(!expected.matches(Some(4)));
        assert!(!expected.matches(None));
    }

    #[test]
    fn absent_matches_only_missing_record() {
        assert!(ExpectedVersion::Absent.matches(None));
        assert!(matches!(
            ExpectedVersion::Absent.check(Some(0)),
            Err(DomainError::Conflict(_))
        ));
    }
}
