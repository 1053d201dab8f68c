use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier held by a tenant administrator.
///
/// Modeled as an opaque string. The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Add, deactivate and invite roster members; allocate and release seats.
    pub const MANAGE_MEMBERS: Permission = Permission(Cow::Borrowed("manage-members"));
    /// Purchase additional seats.
    pub const MANAGE_BILLING: Permission = Permission(Cow::Borrowed("manage-billing"));
    /// Read dashboards, member detail and reports.
    pub const VIEW_REPORTS: Permission = Permission(Cow::Borrowed("view-reports"));
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Every concrete permission an administrator can hold.
    pub fn all() -> [Permission; 3] {
        [Self::MANAGE_MEMBERS, Self::MANAGE_BILLING, Self::VIEW_REPORTS]
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
