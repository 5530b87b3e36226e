//! Closed enumeration of resource kinds.
//!
//! Ownership and existence checks are only ever performed against this
//! compile-time-known set. Lookups dispatch per variant to dedicated typed
//! accessors, so no user-influenced string can ever reach query text.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The resource types the platform performs ownership checks on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Invoice,
    LedgerAccount,
    Customer,
    Report,
    ApiToken,
    Attachment,
    /// A tenant member's profile record, owned by that member.
    MemberProfile,
}

impl ResourceKind {
    /// Stable wire name, used in routes, audit details, and probing keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::LedgerAccount => "ledger_account",
            Self::Customer => "customer",
            Self::Report => "report",
            Self::ApiToken => "api_token",
            Self::Attachment => "attachment",
            Self::MemberProfile => "member_profile",
        }
    }

    /// All known kinds, for registry/diagnostic listings.
    pub const ALL: &'static [ResourceKind] = &[
        Self::Invoice,
        Self::LedgerAccount,
        Self::Customer,
        Self::Report,
        Self::ApiToken,
        Self::Attachment,
        Self::MemberProfile,
    ];
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice" => Ok(Self::Invoice),
            "ledger_account" => Ok(Self::LedgerAccount),
            "customer" => Ok(Self::Customer),
            "report" => Ok(Self::Report),
            "api_token" => Ok(Self::ApiToken),
            "attachment" => Ok(Self::Attachment),
            "member_profile" => Ok(Self::MemberProfile),
            other => Err(CoreError::UnknownResourceKind(other.to_string())),
        }
    }
}
