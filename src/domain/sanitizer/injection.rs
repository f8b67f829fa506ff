//! Prompt-injection neutralisation for untrusted log content.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Token substituted for every neutralised phrase.
pub const FILTERED: &str = "[FILTERED]";

/// Ordered injection patterns with their replacements. Earlier patterns run
/// first, so longer phrasings are listed before the bare role markers they
/// may contain.
static INJECTION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // Instruction override
        (r"(?i)\b(?:ignore|disregard|forget|override|bypass)\s+(?:all\s+|any\s+|the\s+)?(?:previous|prior|above|earlier|preceding|your)\s+(?:instructions?|prompts?|rules|directions|guidelines|context)", FILTERED),
        (r"(?i)\b(?:ignore|forget|disregard)\s+(?:everything|all)\s+(?:above|before|you\s+(?:were|have\s+been)\s+told)", FILTERED),
        (r"(?i)\bnew\s+(?:system\s+)?instructions?\s*:", FILTERED),
        // Role reassignment
        (r"(?i)\byou\s+are\s+now\s+(?:a|an|the|in)\b", FILTERED),
        (r"(?i)\bfrom\s+now\s+on,?\s+you\s+(?:are|will)\b", FILTERED),
        (r"(?i)\b(?:act|behave)\s+as\s+(?:if\s+you\s+(?:are|were)|a|an)\b", FILTERED),
        (r"(?i)\bpretend\s+(?:to\s+be|you\s+are)\b", FILTERED),
        // Chat-template role markers
        (r"(?i)<\|(?:im_start|im_end|system|assistant|user)\|>", FILTERED),
        (r"(?i)\[/?INST\]", FILTERED),
        (r"(?i)<</?SYS>>", FILTERED),
        // Role prefixes only count at the start of a line.
        (r"(?im)^([ \t]*)(?:system|assistant|human|user)[ \t]*:", "${1}[FILTERED]"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("injection pattern compiles"), replacement)
    })
    .collect()
});

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{4,}").expect("newline pattern compiles"));

/// Neutralises prompt-injection attempts in untrusted text.
///
/// # Steps
/// 1. Drop non-printable characters (newline, tab and carriage return stay)
/// 2. Replace injection phrasings and line-leading role markers with [`FILTERED`]
/// 3. Collapse runs of four or more newlines to three
pub fn sanitize(text: &str) -> String {
    let printable: String = text.chars().filter(|c| is_printable(*c)).collect();

    let mut filtered = printable;
    for (pattern, replacement) in INJECTION_PATTERNS.iter() {
        if pattern.is_match(&filtered) {
            filtered = pattern.replace_all(&filtered, *replacement).into_owned();
        }
    }

    EXCESS_NEWLINES.replace_all(&filtered, "\n\n\n").into_owned()
}

/// Rejects control, format (zero-width, bidi, tag characters), private-use,
/// unassigned and separator code points other than the plain space.
fn is_printable(c: char) -> bool {
    if matches!(c, '\n' | '\t' | '\r' | ' ') {
        return true;
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::Surrogate
            | GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}
