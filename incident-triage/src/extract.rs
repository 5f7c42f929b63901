//! Payload extraction from free-form model output.
//!
//! Models asked for a JSON object tend to wrap it in prose or a fenced
//! code block. The scanner below locates the payload with explicit states
//! and documented precedence:
//!
//! 1. first fenced block (``` markers, optional language tag); the inner
//!    content is returned trimmed, unparsed;
//! 2. otherwise the first balanced `{...}` structure, found with a
//!    string- and escape-aware brace scan;
//! 3. otherwise absence. Nothing is synthesized or repaired.
//!
//! Parsing the returned text is the caller's concern; a parse failure and
//! an extraction absence are distinct conditions.

/// Extracted payload with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Inner content of the first fenced block, whitespace-trimmed.
    Fenced(&'a str),
    /// First balanced brace structure found outside any fence.
    Bare(&'a str),
}

impl<'a> Payload<'a> {
    /// The payload text, regardless of provenance.
    pub fn content(&self) -> &'a str {
        match self {
            Payload::Fenced(s) | Payload::Bare(s) => s,
        }
    }
}

/// Locates a structured payload in `text`, fenced matches first.
///
/// Returns `None` when no fenced block closes and no brace structure
/// balances. The first fence wins even when a bare structure precedes it.
pub fn extract_payload(text: &str) -> Option<Payload<'_>> {
    if let Some(inner) = first_fenced_block(text) {
        return Some(Payload::Fenced(inner));
    }
    first_balanced_braces(text).map(Payload::Bare)
}

/// Inner content of the first closed ``` fence, trimmed.
///
/// An opening fence without a closing one is not a match. The optional
/// language tag occupies the rest of the opening line.
fn first_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_marker = &text[open + 3..];
    let body_start = after_marker.find('\n')? + 1;
    let body = &after_marker[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// First balanced `{...}` structure starting at the first `{`.
///
/// Braces and quotes inside JSON strings are skipped via a small
/// in-string/escaped state machine. If the structure starting at the
/// first `{` never balances, that is no match; no later start is tried.
fn first_balanced_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // ASCII scan is safe: multi-byte UTF-8 never contains ASCII bytes.
    for (i, &b) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
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

    #[test]
    fn fenced_json_block_is_extracted() {
        let raw = "```json\n{\"priorita\":\"2\"}\n```";
        assert_eq!(
            extract_payload(raw),
            Some(Payload::Fenced("{\"priorita\":\"2\"}"))
        );
    }

    #[test]
    fn fence_without_language_tag() {
        let raw = "Odpověď:\n```\n{\"priorita\":\"3\"}\n```\nHotovo.";
        assert_eq!(
            extract_payload(raw),
            Some(Payload::Fenced("{\"priorita\":\"3\"}"))
        );
    }

    #[test]
    fn first_fence_wins_over_later_ones() {
        let raw = "```\n{\"priorita\":\"1\"}\n```\ntext\n```\n{\"priorita\":\"3\"}\n```";
        assert_eq!(
            extract_payload(raw).unwrap().content(),
            "{\"priorita\":\"1\"}"
        );
    }

    #[test]
    fn fence_precedes_bare_even_when_brace_comes_first() {
        let raw = "{\"x\":1} and then ```\n{\"priorita\":\"2\"}\n```";
        assert_eq!(
            extract_payload(raw),
            Some(Payload::Fenced("{\"priorita\":\"2\"}"))
        );
    }

    #[test]
    fn unclosed_fence_falls_back_to_bare_scan() {
        let raw = "```json\n{\"priorita\":\"2\"}";
        assert_eq!(
            extract_payload(raw),
            Some(Payload::Bare("{\"priorita\":\"2\"}"))
        );
    }

    #[test]
    fn bare_object_inside_prose() {
        let raw = "Priorita je {\"priorita\":\"2\"} podle popisu.";
        assert_eq!(
            extract_payload(raw),
            Some(Payload::Bare("{\"priorita\":\"2\"}"))
        );
    }

    #[test]
    fn nested_braces_balance() {
        let raw = "x {\"a\":{\"b\":\"1\"}} y";
        assert_eq!(
            extract_payload(raw),
            Some(Payload::Bare("{\"a\":{\"b\":\"1\"}}"))
        );
    }

    #[test]
    fn braces_inside_strings_are_skipped() {
        let raw = "{\"s\":\"}{\",\"p\":\"2\"}";
        assert_eq!(extract_payload(raw), Some(Payload::Bare(raw)));
    }

    #[test]
    fn escaped_quote_inside_string() {
        let raw = "{\"s\":\"a\\\"}b\",\"p\":\"2\"}";
        assert_eq!(extract_payload(raw), Some(Payload::Bare(raw)));
    }

    #[test]
    fn unbalanced_braces_are_no_match() {
        assert_eq!(extract_payload("{\"priorita\":\"2\""), None);
        assert_eq!(extract_payload("closing only }"), None);
    }

    #[test]
    fn prose_without_structure_is_absent() {
        assert_eq!(extract_payload("Some explanation without any structure."), None);
    }

    #[test]
    fn extraction_is_idempotent_on_its_own_output() {
        let samples = [
            "```json\n{\"priorita\":\"2\"}\n```",
            "prose {\"priorita\":\"3\"} prose",
        ];
        for raw in samples {
            let first = extract_payload(raw).unwrap().content();
            let second = extract_payload(first).unwrap().content();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn first_of_multiple_bare_payloads_wins() {
        let raw = "{\"priorita\":\"3\"} or maybe {\"priorita\":\"1\"}";
        assert_eq!(
            extract_payload(raw).unwrap().content(),
            "{\"priorita\":\"3\"}"
        );
    }
}
