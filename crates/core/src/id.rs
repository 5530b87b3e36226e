//! Strongly-typed identifiers used across the authorization core.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Identifier of a tenant (the multi-tenant isolation boundary).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// Identifier of a user (the acting identity within a tenant).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| CoreError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(TenantId, "TenantId");
impl_uuid_newtype!(UserId, "UserId");

/// Identifier of a resource within a tenant.
///
/// Resource IDs come from the domain layer and are not necessarily UUIDs
/// (e.g. `inv-123`). They are restricted to a safe identifier alphabet so that
/// an ID can never smuggle query or log-injection payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Maximum accepted identifier length.
    pub const MAX_LEN: usize = 128;

    /// Parse and validate a resource identifier.
    ///
    /// Accepts ASCII alphanumerics plus `-` and `_`; anything else is rejected.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.is_empty() {
            return Err(CoreError::invalid_id("ResourceId: empty"));
        }
        if s.len() > Self::MAX_LEN {
            return Err(CoreError::invalid_id("ResourceId: too long"));
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(CoreError::invalid_id("ResourceId: invalid characters"));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Per-request correlation identifier.
///
/// Minted by the transport layer (or upstream proxy) and echoed in every error
/// envelope and audit record so a denial can be traced end to end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Mint a fresh request ID (UUIDv7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an upstream-provided correlation ID, truncating oversized values.
    pub fn from_upstream(s: impl Into<String>) -> Self {
        let mut s = s.into();
        if s.len() > 64 {
            s.truncate(64);
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_accepts_identifier_alphabet() {
        let id = ResourceId::parse("inv-123").unwrap();
        assert_eq!(id.as_str(), "inv-123");
    }

    #[test]
    fn resource_id_rejects_injection_characters() {
        assert!(ResourceId::parse("inv-123'; DROP TABLE invoices;--").is_err());
        assert!(ResourceId::parse("").is_err());
        assert!(ResourceId::parse("a".repeat(200)).is_err());
    }

    #[test]
    fn request_id_truncates_oversized_upstream_values() {
        let id = RequestId::from_upstream("x".repeat(100));
        assert_eq!(id.as_str().len(), 64);
    }

    #[test]
    fn tenant_id_round_trips_through_str() {
        let id = TenantId::new();
        let parsed: TenantId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
