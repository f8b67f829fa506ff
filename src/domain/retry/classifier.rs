//! Error classification and backoff policy.

use std::fmt;
use std::time::Duration;

/// How a failure should be backed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The backend asked us to slow down.
    RateLimited,
    /// The backend is temporarily over capacity.
    Overloaded,
    /// Any other transient failure.
    Generic,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorClass::RateLimited => "rate_limited",
            ErrorClass::Overloaded => "overloaded",
            ErrorClass::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}

/// An error the retry engine can classify.
pub trait RetryableError: std::error::Error {
    /// Structured error code reported by the backend, if any
    /// (e.g. Anthropic's `rate_limit_error`).
    fn error_code(&self) -> Option<&str> {
        None
    }

    /// Whether another attempt could succeed. Defaults to true.
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Classifies a failure.
///
/// Structured backend codes win. Without one, the error message is matched
/// case-insensitively against known substrings; this is best effort and
/// depends on backends keeping their wording.
pub fn classify<E: RetryableError + ?Sized>(err: &E) -> ErrorClass {
    match err.error_code() {
        Some("rate_limit_error") | Some("rate_limited") => return ErrorClass::RateLimited,
        Some("overloaded_error") | Some("overloaded") => return ErrorClass::Overloaded,
        _ => {}
    }

    let message = err.to_string().to_lowercase();
    if ["rate_limit_error", "rate limit", "429", "too many requests"]
        .iter()
        .any(|needle| message.contains(needle))
    {
        ErrorClass::RateLimited
    } else if ["overloaded", "503"].iter().any(|needle| message.contains(needle)) {
        ErrorClass::Overloaded
    } else {
        ErrorClass::Generic
    }
}

/// Delay before the next attempt after `attempt` (1-based) failed.
///
/// Rate-limit and overload failures wait `60s * attempt`, capped at 120s.
/// Everything else waits `2^attempt` seconds.
pub fn backoff_for(class: ErrorClass, attempt: u32) -> Duration {
    match class {
        ErrorClass::RateLimited | ErrorClass::Overloaded => {
            Duration::from_secs((60 * u64::from(attempt)).min(120))
        }
        ErrorClass::Generic => Duration::from_secs(2u64.saturating_pow(attempt)),
    }
}
