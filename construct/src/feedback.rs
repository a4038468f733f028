//! Prompt builders for the initial request and the corrective retry prompt.

use std::collections::TryReserveError;

use crate::error::AttemptFailure;
use crate::extract::preview;

/// Builds the prompt sent on the first attempt.
///
/// When a schema description is given, an instruction to answer with a JSON
/// document conforming to it is appended, with the schema text embedded verbatim.
///
/// # Examples
///
/// ```
/// use llm_construct::feedback::build_initial_prompt;
///
/// let prompt = build_initial_prompt("Return a user object", Some("{\"name\":\"string\"}"));
/// assert!(prompt.starts_with("Return a user object"));
/// assert!(prompt.contains("{\"name\":\"string\"}"));
/// ```
#[must_use]
pub fn build_initial_prompt(base_prompt: &str, schema: Option<&str>) -> String {
    let mut prompt = base_prompt.to_string();

    if let Some(schema) = schema {
        prompt.push_str(
            "\n\nRespond with a single JSON document that conforms to the following schema. \
             Do not include any text outside the JSON document.\n\nSchema:\n",
        );
        prompt.push_str(schema);
    }

    prompt
}

/// Builds the prompt for the next attempt from the initial prompt and the
/// failure of the attempt that just ran.
///
/// The result depends only on its arguments: earlier failures are never
/// accumulated. Includes:
/// - Attempt counter (e.g., "Attempt 1/3")
/// - The failure description (for parse failures, the per-stage errors only)
/// - A preview of the previous response, bounded to `preview_limit` chars
/// - For rejected documents, the submitted document echoed back
/// - A restatement of the structural requirement
///
/// # Errors
///
/// Returns `TryReserveError` if memory for the prompt cannot be reserved.
///
/// # Examples
///
/// ```
/// use llm_construct::error::AttemptFailure;
/// use llm_construct::feedback::build_corrective_prompt;
///
/// let failure = AttemptFailure::Parse {
///     reason: "verbatim: expected value. Response preview: \"not json\"".to_string(),
///     stages: "verbatim: expected value".to_string(),
/// };
/// let prompt = build_corrective_prompt("Return a user", &failure, Some("not json"), 1, 3, 500).unwrap();
/// assert!(prompt.contains("Attempt 1/3"));
/// assert!(prompt.contains("not json"));
/// ```
pub fn build_corrective_prompt(
    initial_prompt: &str,
    failure: &AttemptFailure,
    raw_response: Option<&str>,
    attempt: usize,
    max_attempts: usize,
    preview_limit: usize,
) -> Result<String, TryReserveError> {
    let response_preview = raw_response.map(|raw| preview(raw, preview_limit));

    let mut segment = format!("Attempt {attempt}/{max_attempts}: ");
    match failure {
        AttemptFailure::Empty => {
            segment.push_str("Your previous response was empty.\n");
        }
        AttemptFailure::Parse { stages, .. } => {
            segment.push_str("Your previous response could not be parsed as JSON.\n\n");
            segment.push_str("Parse error: ");
            segment.push_str(stages);
            segment.push('\n');
        }
        AttemptFailure::Generator { message } => {
            segment.push_str("The previous request failed before a response was produced.\n\n");
            segment.push_str("Error: ");
            segment.push_str(message);
            segment.push('\n');
        }
        AttemptFailure::Rejected { errors, document } => {
            segment.push_str("Your previous JSON document did not pass validation.\n\nErrors:\n");
            for error in errors {
                segment.push_str("  - ");
                segment.push_str(error);
                segment.push('\n');
            }
            segment.push_str("\nYour submission:\n");
            let submitted = serde_json::to_string_pretty(document)
                .unwrap_or_else(|_| document.to_string());
            segment.push_str(&preview(&submitted, preview_limit));
            segment.push('\n');
        }
    }

    if let Some(response_preview) = response_preview.filter(|p| !p.trim().is_empty()) {
        if !matches!(failure, AttemptFailure::Rejected { .. }) {
            segment.push_str(&format!(
                "\nYour response (first {preview_limit} chars):\n{response_preview}\n"
            ));
        }
    }

    segment.push_str(
        "\nPlease respond with a single valid JSON document only, without commentary.",
    );

    let mut prompt = String::new();
    prompt.try_reserve_exact(initial_prompt.len() + 2 + segment.len())?;
    prompt.push_str(initial_prompt);
    prompt.push_str("\n\n");
    prompt.push_str(&segment);
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_failure(stages: &str) -> AttemptFailure {
        AttemptFailure::Parse {
            reason: format!("Could not extract JSON ({stages}). Response preview: \"...\""),
            stages: stages.to_string(),
        }
    }

    #[test]
    fn test_initial_prompt_without_schema_is_base() {
        assert_eq!(build_initial_prompt("Return a user", None), "Return a user");
    }

    #[test]
    fn test_initial_prompt_embeds_schema_verbatim() {
        let schema = "{\n  \"name\": \"string\"\n}";
        let prompt = build_initial_prompt("Return a user", Some(schema));
        assert!(prompt.starts_with("Return a user\n\n"));
        assert!(prompt.ends_with(schema));
        assert!(prompt.contains("JSON document"));
    }

    #[test]
    fn test_corrective_prompt_for_parse_failure() {
        let failure = parse_failure("verbatim: expected value at line 1 column 1");
        let prompt =
            build_corrective_prompt("Return a user", &failure, Some("not json"), 2, 3, 500).unwrap();

        assert!(prompt.starts_with("Return a user\n\n"));
        assert!(prompt.contains("Attempt 2/3"));
        assert!(prompt.contains("could not be parsed"));
        assert!(prompt.contains("expected value at line 1 column 1"));
        assert!(prompt.contains("not json"));
        assert!(prompt.contains("single valid JSON document"));
    }

    #[test]
    fn test_corrective_prompt_for_empty_response() {
        let prompt =
            build_corrective_prompt("Base", &AttemptFailure::Empty, Some("   "), 1, 2, 500).unwrap();
        assert!(prompt.contains("was empty"));
        assert!(!prompt.contains("Your response (first"));
    }

    #[test]
    fn test_corrective_prompt_for_generator_failure() {
        let failure = AttemptFailure::Generator {
            message: "timed out".to_string(),
        };
        let prompt = build_corrective_prompt("Base", &failure, None, 1, 2, 500).unwrap();
        assert!(prompt.contains("Error: timed out"));
    }

    #[test]
    fn test_corrective_prompt_echoes_rejected_document() {
        let failure = AttemptFailure::Rejected {
            errors: vec!["At path '/name': 123 is not of type \"string\"".to_string()],
            document: json!({"name": 123}),
        };
        let prompt =
            build_corrective_prompt("Base", &failure, Some("{\"name\": 123}"), 1, 3, 500).unwrap();
        assert!(prompt.contains("did not pass validation"));
        assert!(prompt.contains("  - At path '/name'"));
        assert!(prompt.contains("Your submission:"));
        assert!(prompt.contains("\"name\": 123"));
    }

    #[test]
    fn test_corrective_prompt_truncates_long_response() {
        let failure = parse_failure("error");
        let raw = "x".repeat(1000);
        let prompt = build_corrective_prompt("Base", &failure, Some(&raw), 1, 3, 500).unwrap();

        let response_section = prompt.split("Your response").nth(1).unwrap();
        assert!(response_section.contains("..."));
        assert!(response_section.len() < 650);
    }

    #[test]
    fn test_corrective_prompt_quotes_response_once() {
        let raw = "Sure thing, no JSON today";
        let failure = match crate::extract::extract_document(raw) {
            Err(crate::extract::ExtractFailure::Parse { reason, stages }) => {
                AttemptFailure::Parse { reason, stages }
            }
            other => panic!("unexpected extraction result: {other:?}"),
        };
        let prompt = build_corrective_prompt("Base", &failure, Some(raw), 1, 3, 500).unwrap();

        assert_eq!(prompt.matches(raw).count(), 1);
        assert!(!prompt.contains("Response preview"));
        assert!(prompt.contains(
            "Parse error: bracket scan: no balanced JSON object or array found; verbatim:"
        ));
    }

    #[test]
    fn test_corrective_prompt_is_not_cumulative() {
        let first = parse_failure("first reason");
        let second = parse_failure("second reason");
        let initial = build_initial_prompt("Base", None);
        let _ = build_corrective_prompt(&initial, &first, Some("a"), 1, 3, 500).unwrap();
        let prompt = build_corrective_prompt(&initial, &second, Some("b"), 2, 3, 500).unwrap();
        assert!(!prompt.contains("first reason"));
        assert!(prompt.contains("second reason"));
    }

    #[test]
    fn test_corrective_prompt_is_deterministic() {
        let failure = parse_failure("same");
        let a = build_corrective_prompt("Base", &failure, Some("raw"), 1, 3, 500).unwrap();
        let b = build_corrective_prompt("Base", &failure, Some("raw"), 1, 3, 500).unwrap();
        assert_eq!(a, b);
    }
}
