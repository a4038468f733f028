//! Locating and parsing a JSON document inside free-form generator output.
//!
//! Generators wrap JSON in markdown fences, prefix it with chatter ("Sure! Here
//! is the result:") or trail it with offers to help further. Extraction tries,
//! in order: fenced blocks, a string-aware bracket scan, and finally the whole
//! trimmed text.

use std::fmt;

use serde_json::Value;

/// Maximum number of characters of offending text quoted in a failure reason.
pub const REASON_PREVIEW_CHARS: usize = 200;

const FENCE: &str = "```";

/// Which extraction path produced the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    /// Interior of a markdown code fence.
    Fenced,
    /// Balanced `{...}` / `[...]` region found by scanning surrounding prose.
    Scanned,
    /// The whole trimmed response.
    Verbatim,
}

impl fmt::Display for ExtractStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fenced => "fenced block",
            Self::Scanned => "bracket scan",
            Self::Verbatim => "verbatim",
        };
        f.write_str(name)
    }
}

/// A successfully extracted document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// The parsed document.
    pub value: Value,
    /// The path that produced it.
    pub stage: ExtractStage,
}

/// Why extraction failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractFailure {
    /// The response was empty or whitespace only.
    Empty,
    /// Every stage failed; `reason` names each stage's error and quotes a preview.
    Parse {
        /// Stage-by-stage failure description including a bounded preview.
        reason: String,
        /// The per-stage errors alone, without the preview.
        stages: String,
    },
}

impl fmt::Display for ExtractFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Generator returned an empty response"),
            Self::Parse { reason, .. } => f.write_str(reason),
        }
    }
}

/// Extracts the first parseable JSON document from `text`.
///
/// Pure: the same input always yields the same output.
///
/// # Errors
///
/// Returns [`ExtractFailure::Empty`] for blank input and
/// [`ExtractFailure::Parse`] when no stage yields valid JSON.
///
/// # Examples
///
/// ```
/// use llm_construct::extract::{extract_document, ExtractStage};
///
/// let out = extract_document("Here you go: {\"ok\": true} Anything else?").unwrap();
/// assert_eq!(out.value["ok"], true);
/// assert_eq!(out.stage, ExtractStage::Scanned);
/// ```
pub fn extract_document(text: &str) -> Result<Extracted, ExtractFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractFailure::Empty);
    }

    let mut failures: Vec<String> = Vec::new();

    let blocks = fenced_blocks(trimmed);
    if !blocks.is_empty() {
        for block in &blocks {
            match serde_json::from_str::<Value>(block.trim()) {
                Ok(value) => {
                    return Ok(Extracted {
                        value,
                        stage: ExtractStage::Fenced,
                    });
                }
                Err(e) => failures.push(format!("{}: {e}", ExtractStage::Fenced)),
            }
        }
    }

    match scan_for_document(trimmed) {
        Ok(value) => {
            return Ok(Extracted {
                value,
                stage: ExtractStage::Scanned,
            });
        }
        Err(e) => failures.push(format!("{}: {e}", ExtractStage::Scanned)),
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Ok(Extracted {
            value,
            stage: ExtractStage::Verbatim,
        }),
        Err(e) => {
            failures.push(format!("{}: {e}", ExtractStage::Verbatim));
            let stages = failures.join("; ");
            Err(ExtractFailure::Parse {
                reason: format!(
                    "Could not extract JSON ({stages}). Response preview: \"{}\"",
                    preview(trimmed, REASON_PREVIEW_CHARS)
                ),
                stages,
            })
        }
    }
}

/// Truncates `text` to at most `limit` characters, appending `...` when cut.
///
/// Cuts on a char boundary, so multi-byte text is never split.
#[must_use]
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Returns the interiors of all closed fenced blocks, in order.
///
/// An opening fence may carry a language hint (```` ```json ````); the hint runs to
/// the end of the fence line and is dropped. A fence without a closing partner
/// is ignored.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let body_start = fence_body_start(after_open);
        let body = &after_open[body_start..];
        let Some(close) = body.find(FENCE) else {
            break;
        };
        blocks.push(&body[..close]);
        rest = &body[close + FENCE.len()..];
    }

    blocks
}

/// Skips a language hint (a single identifier-like word) after an opening fence.
fn fence_body_start(after_open: &str) -> usize {
    let line_end = after_open.find('\n').unwrap_or(after_open.len());
    let hint = after_open[..line_end].trim();
    let is_hint = hint
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'));
    if is_hint {
        (line_end + 1).min(after_open.len())
    } else {
        0
    }
}

/// Tries every `{` or `[` in order as a document start.
///
/// Returns the first balanced candidate that parses. Otherwise reports the
/// parse error of the first balanced candidate, or that none was found.
fn scan_for_document(text: &str) -> Result<Value, String> {
    let mut first_error: Option<String> = None;
    let mut from = 0;

    while let Some(offset) = text[from..].find(['{', '[']) {
        let start = from + offset;
        if let Some(candidate) = balanced_from(text, start) {
            match serde_json::from_str::<Value>(candidate) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        from = start + 1;
    }

    Err(first_error.unwrap_or_else(|| "no balanced JSON object or array found".to_string()))
}

/// Returns the balanced region opening at `start`, if its brackets close.
///
/// Quotes are tracked from `start` on, so brackets inside JSON strings are
/// ignored and prose before the region cannot open a string. A closing
/// bracket that does not match its opener rejects the region.
fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut in_string = false;
    let mut escape_next = false;
    let mut closers: Vec<char> = Vec::new();

    for (offset, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => closers.push('}'),
            '[' if !in_string => closers.push(']'),
            '}' | ']' if !in_string => {
                if closers.pop() != Some(ch) {
                    return None;
                }
                if closers.is_empty() {
                    return Some(&text[start..=start + offset]);
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
    use serde_json::json;

    #[test]
    fn test_plain_document_is_scanned() {
        let out = extract_document("{\"name\":\"Ann\"}").unwrap();
        assert_eq!(out.value, json!({"name": "Ann"}));
        assert_eq!(out.stage, ExtractStage::Scanned);
    }

    #[test]
    fn test_scalar_falls_through_to_verbatim() {
        let out = extract_document("  42 ").unwrap();
        assert_eq!(out.value, json!(42));
        assert_eq!(out.stage, ExtractStage::Verbatim);
    }

    #[test]
    fn test_blank_is_empty() {
        assert_eq!(extract_document(""), Err(ExtractFailure::Empty));
        assert_eq!(extract_document(" \n\t "), Err(ExtractFailure::Empty));
    }

    #[test]
    fn test_fenced_with_hint_and_prose() {
        let text = "Sure! ```json\n{\"name\":\"Ann\"}\n``` Let me know.";
        let out = extract_document(text).unwrap();
        assert_eq!(out.value, json!({"name": "Ann"}));
        assert_eq!(out.stage, ExtractStage::Fenced);
    }

    #[test]
    fn test_fenced_without_hint() {
        let text = "Result:\n```\n[1, 2, 3]\n```";
        let out = extract_document(text).unwrap();
        assert_eq!(out.value, json!([1, 2, 3]));
        assert_eq!(out.stage, ExtractStage::Fenced);
    }

    #[test]
    fn test_inline_fence_without_newline() {
        let out = extract_document("```{\"a\": 1}```").unwrap();
        assert_eq!(out.value, json!({"a": 1}));
        assert_eq!(out.stage, ExtractStage::Fenced);
    }

    #[test]
    fn test_second_fence_used_when_first_is_not_json() {
        let text = "```bash\ncargo run\n```\nand the data:\n```json\n{\"ok\": true}\n```";
        let out = extract_document(text).unwrap();
        assert_eq!(out.value, json!({"ok": true}));
        assert_eq!(out.stage, ExtractStage::Fenced);
    }

    #[test]
    fn test_unclosed_fence_falls_back_to_scan() {
        let text = "```json\n{\"ok\": true}";
        let out = extract_document(text).unwrap();
        assert_eq!(out.value, json!({"ok": true}));
        assert_eq!(out.stage, ExtractStage::Scanned);
    }

    #[test]
    fn test_scan_tolerates_prose_around_document() {
        let text = "Here is the result: {\"items\": [1, {\"x\": \"}\"}]} Let me know if you need changes.";
        let out = extract_document(text).unwrap();
        assert_eq!(out.value, json!({"items": [1, {"x": "}"}]}));
        assert_eq!(out.stage, ExtractStage::Scanned);
    }

    #[test]
    fn test_scan_handles_escaped_quotes() {
        let text = r#"Output: {"quote": "she said \"{hi}\""} done"#;
        let out = extract_document(text).unwrap();
        assert_eq!(out.value, json!({"quote": "she said \"{hi}\""}));
    }

    #[test]
    fn test_scan_skips_brackets_in_quoted_prose() {
        let text = r#"The "[draft]" is replaced by {"final": 1}"#;
        let out = extract_document(text).unwrap();
        assert_eq!(out.value, json!({"final": 1}));
    }

    #[test]
    fn test_scan_finds_array() {
        let out = extract_document("Values: [\"a\", \"b\"].").unwrap();
        assert_eq!(out.value, json!(["a", "b"]));
    }

    #[test]
    fn test_mismatched_brackets_report_every_stage() {
        let err = extract_document("oops {\"a\": [1}").unwrap_err();
        let ExtractFailure::Parse { reason, stages } = err else {
            panic!("expected parse failure");
        };
        assert!(reason.contains("bracket scan: no balanced JSON"));
        assert!(reason.contains("verbatim:"));
        assert!(reason.contains("Response preview: \"oops {\"a\": [1}\""));
        assert!(reason.contains(&stages));
        assert!(!stages.contains("Response preview"));
    }

    #[test]
    fn test_scan_moves_past_bracketed_prose() {
        let out = extract_document("Use [brackets] for lists. Result: {\"a\": 1}").unwrap();
        assert_eq!(out.value, json!({"a": 1}));
        assert_eq!(out.stage, ExtractStage::Scanned);
    }

    #[test]
    fn test_scan_moves_past_mismatched_region() {
        let out = extract_document("Steps (1] and [2} done: [1, 2]").unwrap();
        assert_eq!(out.value, json!([1, 2]));
    }

    #[test]
    fn test_unmatched_quote_in_prose_does_not_hide_document() {
        let out = extract_document("My 27\" monitor spec: {\"a\": 1}").unwrap();
        assert_eq!(out.value, json!({"a": 1}));
        assert_eq!(out.stage, ExtractStage::Scanned);
    }

    #[test]
    fn test_scan_reports_first_candidate_error() {
        let err = extract_document("see [here] and [there]").unwrap_err();
        assert!(err.to_string().contains("bracket scan: expected value at line 1 column 2"));
    }

    #[test]
    fn test_failure_reason_names_fence_stage() {
        let err = extract_document("```json\n{not valid}\n```").unwrap_err();
        assert!(err.to_string().contains("fenced block:"));
    }

    #[test]
    fn test_failure_preview_is_bounded() {
        let text = "x".repeat(5000);
        let err = extract_document(&text).unwrap_err();
        let reason = err.to_string();
        assert!(reason.contains("..."));
        assert!(reason.len() < 1000);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "Sure ```json\n{\"a\": [1, 2]}\n```";
        assert_eq!(extract_document(text), extract_document(text));
        let bad = "not json";
        assert_eq!(extract_document(bad), extract_document(bad));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("你好世界", 2), "你好...");
    }
}
