//! Detail sanitization applied before an event enters the buffer.

use serde_json::{Map, Value};

/// Key substrings whose values are always redacted, case-insensitive.
const SECRET_KEY_PATTERNS: &[&str] = &[
    "password",
    "secret",
    "token",
    "apikey",
    "api_key",
    "authorization",
    "cookie",
    "credential",
    "private",
];

const REDACTED: &str = "[REDACTED]";

/// Redact secret-like fields and mask resource identifiers in a detail map.
///
/// Applied once, at event construction; everything downstream (buffer, sink,
/// synchronous log mirror) only ever sees sanitized details.
pub fn sanitize_details(details: Map<String, Value>) -> Map<String, Value> {
    details
        .into_iter()
        .map(|(key, value)| {
            let lower = key.to_ascii_lowercase();
            if SECRET_KEY_PATTERNS.iter().any(|p| lower.contains(p)) {
                return (key, Value::String(REDACTED.to_string()));
            }
            if lower == "resource_id" || lower.ends_with("_resource_id") {
                if let Value::String(s) = &value {
                    return (key, Value::String(mask_identifier(s)));
                }
            }
            (key, value)
        })
        .collect()
}

/// Mask an identifier down to its first and last four characters.
///
/// Short identifiers (8 chars or fewer) carry too little entropy to be worth
/// masking and are passed through.
pub fn mask_identifier(id: &str) -> String {
    if id.len() <= 8 {
        return id.to_string();
    }
    let head: String = id.chars().take(4).collect();
    let tail: String = id.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secret_like_keys_are_redacted() {
        let mut details = Map::new();
        details.insert("api_token".to_string(), json!("tok_abcdef"));
        details.insert("Password".to_string(), json!("hunter2"));
        details.insert("note".to_string(), json!("kept"));

        let out = sanitize_details(details);
        assert_eq!(out["api_token"], json!("[REDACTED]"));
        assert_eq!(out["Password"], json!("[REDACTED]"));
        assert_eq!(out["note"], json!("kept"));
    }

    #[test]
    fn resource_ids_are_masked() {
        let mut details = Map::new();
        details.insert("resource_id".to_string(), json!("inv-20240817-0042"));

        let out = sanitize_details(details);
        assert_eq!(out["resource_id"], json!("inv-...0042"));
    }

    #[test]
    fn short_identifiers_pass_through() {
        assert_eq!(mask_identifier("inv-1"), "inv-1");
        assert_eq!(mask_identifier("12345678"), "12345678");
        assert_eq!(mask_identifier("123456789"), "1234...6789");
    }
}
