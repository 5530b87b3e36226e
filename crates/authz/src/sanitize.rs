//! Trust-boundary sanitization of denial reasons.
//!
//! Internal reason codes stay fully detailed in logs and audit records. Before
//! any text crosses the trust boundary (HTTP response, thrown service error)
//! it passes through here, so a caller can never learn whether a tenant
//! exists, a resource exists, or a membership is inactive from error-message
//! differences.

use crate::request::DecisionReason;

/// The one message external callers see for every denial.
pub const ACCESS_DENIED: &str = "Access denied";

/// Messages allowed to cross the trust boundary verbatim.
const SAFE_VOCABULARY: &[&str] = &[
    ACCESS_DENIED,
    "Authentication required",
    "Too many requests",
    "Internal error",
];

/// Substrings that mark a message as sensitive. Matched case-insensitively.
const SENSITIVE_PATTERNS: &[&str] = &[
    "tenant not found",
    "tenant is inactive",
    "tenant inactive",
    "not a member",
    "membership",
    "cross-tenant",
    "cross tenant",
    "ownership",
    "owner",
    "role mismatch",
    "does not exist",
    "not found",
    "probing",
    "inactive",
];

/// Collapse a potentially sensitive message into the safe vocabulary.
///
/// Anything not explicitly on the safe list is treated as sensitive; the
/// denylist exists to catch messages that embed store/validator text, but the
/// default posture is to collapse.
pub fn sanitize_reason(text: &str) -> &'static str {
    let lower = text.to_ascii_lowercase();
    if SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ACCESS_DENIED;
    }
    SAFE_VOCABULARY
        .iter()
        .find(|s| **s == text)
        .copied()
        .unwrap_or(ACCESS_DENIED)
}

/// Stable opaque code for a reason, safe to expose.
///
/// Every tenant/resource/decision denial collapses to `ACCESS_DENIED`;
/// infrastructure failures report `AUTHORIZATION_ERROR` (without detail) so
/// operators can tell a 5xx from a policy denial, and nothing else.
pub fn public_code(reason: DecisionReason) -> &'static str {
    match reason {
        DecisionReason::Granted => "OK",
        DecisionReason::AuthorizationError => "AUTHORIZATION_ERROR",
        _ => "ACCESS_DENIED",
    }
}

/// Public message for a reason, always from the safe vocabulary.
pub fn public_message(reason: DecisionReason) -> &'static str {
    match reason {
        DecisionReason::Granted => "OK",
        DecisionReason::AuthorizationError => "Internal error",
        _ => ACCESS_DENIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_reasons_collapse() {
        assert_eq!(sanitize_reason("tenant not found"), ACCESS_DENIED);
        assert_eq!(sanitize_reason("Cross-tenant access attempt"), ACCESS_DENIED);
        assert_eq!(sanitize_reason("resource ownership denied"), ACCESS_DENIED);
        assert_eq!(sanitize_reason("invoice inv-123 does not exist"), ACCESS_DENIED);
    }

    #[test]
    fn safe_vocabulary_passes_through() {
        assert_eq!(sanitize_reason("Access denied"), ACCESS_DENIED);
        assert_eq!(sanitize_reason("Too many requests"), "Too many requests");
    }

    #[test]
    fn unknown_text_collapses_by_default() {
        assert_eq!(sanitize_reason("some novel diagnostic"), ACCESS_DENIED);
    }

    #[test]
    fn masked_reasons_are_indistinguishable() {
        // The anti-enumeration core property: different internal reasons,
        // identical public surface.
        let reasons = [
            DecisionReason::ResourceNotFound,
            DecisionReason::ResourceTenantMismatch,
            DecisionReason::ResourceOwnershipDenied,
            DecisionReason::TenantNotFound,
            DecisionReason::ProbingDetected,
        ];
        for r in reasons {
            assert_eq!(public_code(r), "ACCESS_DENIED");
            assert_eq!(public_message(r), ACCESS_DENIED);
        }
    }
}
