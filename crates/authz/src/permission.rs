//! Permission identifier.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission token (e.g. `accounting:delete`).
///
/// Permissions are opaque `module:action` strings from the closed vocabulary
/// owned by [`PermissionRegistry`](crate::PermissionRegistry); this type does
/// not validate membership, the registry does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}
