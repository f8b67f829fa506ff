//! Balanced-brace extraction of a JSON object from free-form model output.

/// Returns the first balanced top-level `{...}` object in `text`.
///
/// Braces inside string literals are ignored, and a backslash inside a
/// string skips the following character so escaped quotes do not end the
/// string. Any text after the first complete object is discarded, including
/// further objects. Returns `None` when there is no `{` or the object never
/// closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = "Here is my answer:\n{\"a\": 1}\nThanks.";
        assert_eq!(extract_json_object(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn handles_nested_objects() {
        let text = r#"x {"a": {"b": {"c": 1}}, "d": 2} y"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": {"b": {"c": 1}}, "d": 2}"#)
        );
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"prefix {"msg": "use } and { freely"} suffix"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"msg": "use } and { freely"}"#)
        );
    }

    #[test]
    fn honours_escaped_quotes() {
        let text = r#"He wrote {"msg":"He said \"hi\""} and left."#;
        assert_eq!(extract_json_object(text), Some(r#"{"msg":"He said \"hi\""}"#));
    }

    #[test]
    fn honours_escaped_backslash_before_quote() {
        let text = r#"{"path":"C:\\"} tail"#;
        assert_eq!(extract_json_object(text), Some(r#"{"path":"C:\\"}"#));
    }

    #[test]
    fn returns_first_of_several_objects() {
        let text = r#"{"first": true} and then {"second": true}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"first": true}"#));
    }

    #[test]
    fn returns_none_without_opening_brace() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn returns_none_when_unbalanced() {
        assert_eq!(extract_json_object(r#"{"key": "value""#), None);
        assert_eq!(extract_json_object(r#"{"a": {"b": 1}"#), None);
    }

    #[test]
    fn handles_multibyte_text() {
        let text = "résumé → {\"ключ\": \"значение ✓\"} ✔";
        assert_eq!(extract_json_object(text), Some("{\"ключ\": \"значение ✓\"}"));
    }

    proptest! {
        #[test]
        fn extraction_is_idempotent_on_string_free_json(
            keys in proptest::collection::vec("[a-z]{1,6}", 0..6),
            prefix in "[a-zA-Z .:]{0,20}",
            suffix in "[a-zA-Z .:{]{0,20}",
        ) {
            let body = keys
                .iter()
                .map(|k| format!("{k}: {{{k}: 1}}"))
                .collect::<Vec<_>>()
                .join(", ");
            let text = format!("{prefix}{{{body}}}{suffix}");
            let once = extract_json_object(&text);
            prop_assert!(once.is_some());
            prop_assert_eq!(once.and_then(extract_json_object), once);
        }
    }
}
