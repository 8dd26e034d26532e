//! Credential redaction.
//!
//! Patterns are applied in a fixed order. Where a pattern captures a key
//! name or vendor prefix in group 1, that prefix survives and only the
//! secret part is replaced with [`REDACTED`]. The marker itself never
//! matches any pattern, so redaction is idempotent.

use regex_lite::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

/// Replacement marker for detected secrets.
pub const REDACTED: &str = "[REDACTED]";

struct SecretPattern {
    name: &'static str,
    regex: Regex,
}

// Order matters: vendor-specific prefixes run before the generic shapes so
// `sk-ant-` keys keep their full prefix.
static PATTERNS: LazyLock<Vec<SecretPattern>> = LazyLock::new(|| {
    [
        (
            "private_key",
            r"-----BEGIN\s+(?:[A-Z]+\s+)*PRIVATE\s+KEY-----[\s\S]*?-----END\s+(?:[A-Z]+\s+)*PRIVATE\s+KEY-----",
        ),
        ("anthropic_key", r"(sk-ant-)[A-Za-z0-9_\-]{20,}"),
        ("openai_key", r"(sk-(?:proj-)?)[A-Za-z0-9]{20,}"),
        ("aws_access_key", r"AKIA[0-9A-Z]{16}"),
        (
            "aws_secret_key",
            r"(?i)(aws_secret_access_key\s*[=:]\s*)[A-Za-z0-9/+=]{40}",
        ),
        ("github_token", r"(gh[pousr]_)[A-Za-z0-9_]{36,}"),
        ("bearer_token", r"(?i)(Bearer\s+)[A-Za-z0-9\-_./+=]{20,}"),
        (
            "key_value",
            r#"(?i)((?:api[_-]?key|secret|token|password|credential|auth)\s*[=:]\s*["']?)[A-Za-z0-9\-_./+=]{16,}"#,
        ),
        (
            "connection_password",
            r#"(?i)((?:password|pwd)\s*=\s*)[^;"'\s\[]{8,}"#,
        ),
        ("base64_blob", r"[A-Za-z0-9+/]{64,}={0,2}"),
    ]
    .into_iter()
    .map(|(name, pattern)| SecretPattern {
        name,
        regex: Regex::new(pattern).expect("built-in secret pattern must compile"),
    })
    .collect()
});

/// Mask every detected secret in `text`.
///
/// Returns the input unchanged (borrowed) when nothing matched.
pub fn redact_secrets(text: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(text);

    for pattern in PATTERNS.iter() {
        let replaced = match pattern.regex.replace_all(&out, |caps: &Captures<'_>| {
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            format!("{}{}", prefix, REDACTED)
        }) {
            Cow::Borrowed(_) => None,
            Cow::Owned(s) => Some(s),
        };

        if let Some(s) = replaced {
            debug!(pattern = pattern.name, "Redacted secret from output");
            out = Cow::Owned(s);
        }
    }

    out
}

/// Whether `text` contains anything that would be redacted.
pub fn contains_secret(text: &str) -> bool {
    PATTERNS.iter().any(|p| p.regex.is_match(text))
}
