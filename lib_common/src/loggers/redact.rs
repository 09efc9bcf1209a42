//! # Secret Redaction
//!
//! Pattern-based scrubbing applied to every message and structured extra before
//! it leaves the process through a log sink. API keys travel as query
//! parameters on several upstreams, so request paths and error strings are
//! routinely passed through here.

use regex::Regex;
use serde_json::Value;
use static_init::dynamic;

/// Ordered `(pattern, replacement)` pairs. Earlier rules run first.
const SENSITIVE_PATTERNS: [(&str, &str); 5] = [
    (r"(?i)[A-Za-z0-9]{32,}", "[API_KEY_REDACTED]"),
    (r"(?i)ghp_[A-Za-z0-9]{36}", "[GITHUB_TOKEN_REDACTED]"),
    (r"(?i)sk-[A-Za-z0-9]{48}", "[SECRET_KEY_REDACTED]"),
    (r"(?i)password[=:]\s*\S+", "password=[REDACTED]"),
    (r"(?i)token[=:]\s*\S+", "token=[REDACTED]"),
];

#[dynamic]
static RULES: Vec<(Regex, &'static str)> = SENSITIVE_PATTERNS
    .iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, *replacement)))
    .collect();

/// Replaces every sensitive pattern in `message` with its placeholder.
pub fn redact(message: &str) -> String {
    let mut sanitized = message.to_string();
    for (re, replacement) in RULES.iter() {
        sanitized = re.replace_all(&sanitized, *replacement).into_owned();
    }
    sanitized
}

/// Recursively redacts every string (keys excluded) inside a JSON value.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_long_api_key_is_redacted() {
        let msg = "GET /query?apikey=ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 failed";
        let out = redact(msg);
        assert_eq!(out, "GET /query?apikey=[API_KEY_REDACTED] failed");
    }

    #[test]
    fn test_password_and_token_pairs() {
        assert_eq!(redact("password: hunter2"), "password=[REDACTED]");
        assert_eq!(redact("TOKEN=abc123 next"), "token=[REDACTED] next");
    }

    #[test]
    fn test_secret_key_never_survives() {
        let key = format!("sk-{}", "a1".repeat(24));
        let out = redact(&format!("using {}", key));
        assert!(!out.contains(&key));
        assert!(out.starts_with("using sk-["));
    }

    #[test]
    fn test_short_words_untouched() {
        assert_eq!(redact("AAPL options fetched"), "AAPL options fetched");
    }

    #[test]
    fn test_redact_value_walks_nested_strings() {
        let extras = json!({
            "path": "everything?apiKey=0123456789abcdef0123456789abcdef",
            "attempt": 2,
            "nested": ["password=x", {"token": "token:y"}]
        });
        let out = redact_value(&extras);
        assert_eq!(out["path"], "everything?apiKey=[API_KEY_REDACTED]");
        assert_eq!(out["attempt"], 2);
        assert_eq!(out["nested"][0], "password=[REDACTED]");
        assert_eq!(out["nested"][1]["token"], "token=[REDACTED]");
    }
}
