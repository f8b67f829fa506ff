//! Repair of invalid backslash escapes in model-generated JSON.

use std::borrow::Cow;

/// Characters that may legally follow a backslash in JSON.
const VALID_ESCAPES: [char; 9] = ['"', '\\', '/', 'b', 'f', 'n', 'r', 't', 'u'];

/// Drops the backslash from every escape sequence JSON does not allow.
///
/// Models often write things like `\.` or `\-` copied from regexes or
/// shell output. Valid escapes are copied unchanged, so already-valid JSON
/// comes back identical.
pub fn repair_escapes(json: &str) -> Cow<'_, str> {
    if !json.contains('\\') {
        return Cow::Borrowed(json);
    }

    let mut repaired = String::with_capacity(json.len());
    let mut chars = json.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            repaired.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if VALID_ESCAPES.contains(&next) => {
                repaired.push('\\');
                repaired.push(next);
            }
            Some(next) => repaired.push(next),
            // Trailing lone backslash; leave it for the decoder to reject.
            None => repaired.push('\\'),
        }
    }

    Cow::Owned(repaired)
}
