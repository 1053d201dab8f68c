use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Administrator role within a tenant.
///
/// Only `owner` carries meaning at this layer: it implies every permission.
/// Other role names are labels; their grants come from the explicit permission
/// set on the admin record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const OWNER: Role = Role(Cow::Borrowed("owner"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn owner() -> Self {
        Self::OWNER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_owner(&self) -> bool {
        self.as_str() == "owner"
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
