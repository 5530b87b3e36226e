//! Subject identity resolution.

use std::net::IpAddr;

use ledgergate_core::{TenantId, UserId};

/// The identity a subject's abuse state is keyed by.
///
/// Resolution always prefers the most specific identity available:
/// `tenant+user` over `tenant+ip` over bare `ip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    TenantUser(TenantId, UserId),
    TenantIp(TenantId, IpAddr),
    Ip(IpAddr),
}

impl SubjectKey {
    pub fn resolve(tenant: Option<TenantId>, user: Option<UserId>, ip: IpAddr) -> Self {
        match (tenant, user) {
            (Some(tenant), Some(user)) => Self::TenantUser(tenant, user),
            (Some(tenant), None) => Self::TenantIp(tenant, ip),
            _ => Self::Ip(ip),
        }
    }

    /// Stable string form, used as the rate-limiter bucket key.
    pub fn bucket_key(&self) -> String {
        match self {
            Self::TenantUser(t, u) => format!("tu:{t}:{u}"),
            Self::TenantIp(t, ip) => format!("ti:{t}:{ip}"),
            Self::Ip(ip) => format!("ip:{ip}"),
        }
    }

    /// Tenant/user pair when the subject is fully identified (for audit).
    pub fn tenant_user(&self) -> Option<(TenantId, UserId)> {
        match self {
            Self::TenantUser(t, u) => Some((*t, *u)),
            _ => None,
        }
    }
}

impl core::fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.bucket_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_prefers_most_specific() {
        let tenant = TenantId::new();
        let user = UserId::new();
        let ip: IpAddr = "203.0.113.7".parse().unwrap();

        assert_eq!(
            SubjectKey::resolve(Some(tenant), Some(user), ip),
            SubjectKey::TenantUser(tenant, user)
        );
        assert_eq!(
            SubjectKey::resolve(Some(tenant), None, ip),
            SubjectKey::TenantIp(tenant, ip)
        );
        assert_eq!(SubjectKey::resolve(None, Some(user), ip), SubjectKey::Ip(ip));
        assert_eq!(SubjectKey::resolve(None, None, ip), SubjectKey::Ip(ip));
    }
}
