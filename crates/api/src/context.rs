//! Request identity extraction.
//!
//! The gateway in front of this service authenticates callers and forwards
//! the verified identity as headers. This module turns those headers into the
//! [`TenantContext`] the authorization layer consumes. The asserted role is
//! still re-verified against the membership record on every decision, so a
//! forged role header can never widen access.

use std::net::IpAddr;

use axum::http::HeaderMap;

use ledgergate_authz::{Role, TenantContext};
use ledgergate_core::{RequestId, TenantId, UserId};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-role";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Build a [`TenantContext`] from forwarded identity headers.
///
/// Returns `Ok(None)` when no identity headers are present (anonymous
/// request) and `Err` when they are present but unparseable.
pub fn context_from_headers(headers: &HeaderMap) -> Result<Option<TenantContext>, &'static str> {
    let tenant = header_str(headers, TENANT_HEADER);
    let user = header_str(headers, USER_HEADER);
    let role = header_str(headers, ROLE_HEADER);

    let (Some(tenant), Some(user), Some(role)) = (tenant, user, role) else {
        if headers.contains_key(TENANT_HEADER)
            || headers.contains_key(USER_HEADER)
            || headers.contains_key(ROLE_HEADER)
        {
            return Err("Incomplete identity headers");
        }
        return Ok(None);
    };

    let tenant_id: TenantId = tenant.parse().map_err(|_| "Invalid tenant id")?;
    let user_id: UserId = user.parse().map_err(|_| "Invalid user id")?;
    let role: Role = role.parse().map_err(|_| "Invalid role")?;

    let request_id = match header_str(headers, REQUEST_ID_HEADER) {
        Some(upstream) => RequestId::from_upstream(upstream),
        None => RequestId::new(),
    };

    Ok(Some(TenantContext::new(tenant_id, user_id, role, request_id)))
}

/// Client address for abuse accounting: first hop of `x-forwarded-for`, then
/// the socket peer address for direct connections. The unspecified address is
/// a last resort so that unattributable traffic is never dropped from
/// accounting entirely.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> IpAddr {
    header_str(headers, FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or(peer)
        .unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn absent_headers_yield_no_context() {
        let headers = HeaderMap::new();
        assert_eq!(context_from_headers(&headers).unwrap(), None);
    }

    #[test]
    fn partial_headers_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("not-even-a-uuid"));
        assert!(context_from_headers(&headers).is_err());
    }

    #[test]
    fn full_headers_build_a_context() {
        let tenant = TenantId::new();
        let user = UserId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            TENANT_HEADER,
            HeaderValue::from_str(&tenant.to_string()).unwrap(),
        );
        headers.insert(
            USER_HEADER,
            HeaderValue::from_str(&user.to_string()).unwrap(),
        );
        headers.insert(ROLE_HEADER, HeaderValue::from_static("MANAGER"));
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));

        let ctx = context_from_headers(&headers).unwrap().unwrap();
        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.user_id, user);
        assert_eq!(ctx.role, Role::Manager);
        assert_eq!(ctx.request_id.as_str(), "req-42");
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let peer: IpAddr = "198.51.100.7".parse().unwrap();
        assert_eq!(
            client_ip(&headers, Some(peer)),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn direct_connections_fall_back_to_peer_address() {
        // Each direct caller must map to its own abuse subject.
        let empty = HeaderMap::new();
        let peer: IpAddr = "198.51.100.7".parse().unwrap();
        assert_eq!(client_ip(&empty, Some(peer)), peer);
        assert_eq!(client_ip(&empty, None), IpAddr::from([0, 0, 0, 0]));
    }
}
