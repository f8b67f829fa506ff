//! Credential scrubbing for backend text echoed into errors and logs.

use once_cell::sync::Lazy;
use regex::Regex;

const REDACTED: &str = "[REDACTED]";

/// Maximum bytes of a backend body kept in an error message.
pub const MAX_ERROR_BODY: usize = 512;

static SECRET_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"sk-ant-[A-Za-z0-9_\-]{8,}", REDACTED),
        (r"\bsk-[A-Za-z0-9_\-]{16,}", REDACTED),
        (r"(?i)\bbearer\s+[A-Za-z0-9._\-]{8,}", "Bearer [REDACTED]"),
        // Telegram bot tokens: <bot id>:<35 char secret>
        (r"\b\d{6,12}:[A-Za-z0-9_\-]{30,}", REDACTED),
        (
            r#"(?i)\b(x-api-key|api[_-]?key|token)(["']?\s*[:=]\s*["']?)[A-Za-z0-9._\-]{8,}"#,
            "${1}${2}[REDACTED]",
        ),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("secret pattern compiles"), replacement)
    })
    .collect()
});

/// Replaces credential-shaped substrings with a redaction marker.
pub fn redact_secrets(text: &str) -> String {
    let mut redacted = text.to_string();
    for (pattern, replacement) in SECRET_PATTERNS.iter() {
        if pattern.is_match(&redacted) {
            redacted = pattern.replace_all(&redacted, *replacement).into_owned();
        }
    }
    redacted
}

/// Redacts and truncates a backend body for inclusion in an error.
pub fn error_snippet(body: &str) -> String {
    let redacted = redact_secrets(body.trim());
    if redacted.len() <= MAX_ERROR_BODY {
        return redacted;
    }
    let mut end = MAX_ERROR_BODY;
    while !redacted.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &redacted[..end])
}
