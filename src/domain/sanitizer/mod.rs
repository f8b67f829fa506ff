//! Sanitizer module - guards both directions of untrusted text.
//!
//! - `injection` - neutralises prompt-injection attempts in log content and
//!   historical context before they are embedded in a prompt
//! - `redact` - scrubs credentials from backend text before it reaches an
//!   error message or a log line

mod injection;
mod redact;

pub use injection::{sanitize, FILTERED};
pub use redact::{error_snippet, redact_secrets, MAX_ERROR_BODY};
