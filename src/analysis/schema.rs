//! Strict validation of the service's JSON response.
//!
//! The inference service is constrained by a response schema, but the
//! contract is enforced again locally: every field is checked against a rule
//! table and all violations are reported in a single error, so one bad
//! response yields one complete diagnosis.

use crate::analysis::models::{CommunicationAnalysis, Transcript};
use crate::error::{KlarError, Result};
use serde_json::Value;

/// Maximum length of the communication focus summary.
pub const MAX_FOCUS_CHARS: usize = 300;

/// A response field and the check applied to it.
struct FieldRule {
    field: &'static str,
    check: fn(&Value) -> std::result::Result<(), String>,
}

const RULES: &[FieldRule] = &[
    FieldRule {
        field: "transcript",
        check: check_transcript,
    },
    FieldRule {
        field: "clarity_score",
        check: check_clarity_score,
    },
    FieldRule {
        field: "communication_focus",
        check: check_focus,
    },
];

/// Parses raw model output and enforces the response contract.
///
/// Unknown extra fields are ignored; missing or malformed required fields are
/// aggregated into one `SchemaViolation` naming each offender.
pub fn parse_and_validate(raw: &str) -> Result<CommunicationAnalysis> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| KlarError::SchemaViolation(format!("Response is not valid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| KlarError::SchemaViolation("Response is not a JSON object".into()))?;

    let mut violations = Vec::new();
    for rule in RULES {
        let outcome = match object.get(rule.field) {
            Some(field_value) => (rule.check)(field_value),
            None => Err("missing".to_string()),
        };
        if let Err(problem) = outcome {
            violations.push(format!("{}: {}", rule.field, problem));
        }
    }

    if !violations.is_empty() {
        return Err(KlarError::SchemaViolation(violations.join("; ")));
    }

    serde_json::from_value(value)
        .map_err(|e| KlarError::SchemaViolation(format!("Response did not deserialize: {e}")))
}

fn check_transcript(value: &Value) -> std::result::Result<(), String> {
    let transcript: Transcript = serde_json::from_value(value.clone())
        .map_err(|_| "must be a string or an array of strings".to_string())?;
    if transcript.is_empty() {
        return Err("must not be empty".to_string());
    }
    Ok(())
}

fn check_clarity_score(value: &Value) -> std::result::Result<(), String> {
    // as_i64 is None for floats, so 82.5 is rejected rather than coerced
    let score = value
        .as_i64()
        .ok_or_else(|| "must be an integer".to_string())?;
    if !(0..=100).contains(&score) {
        return Err(format!("{score} is outside 0-100"));
    }
    Ok(())
}

fn check_focus(value: &Value) -> std::result::Result<(), String> {
    let focus = value.as_str().ok_or_else(|| "must be a string".to_string())?;
    if focus.trim().is_empty() {
        return Err("must not be empty".to_string());
    }
    if focus.chars().count() > MAX_FOCUS_CHARS {
        return Err(format!("exceeds {MAX_FOCUS_CHARS} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "transcript": "Thanks everyone for joining today.",
        "clarity_score": 82,
        "communication_focus": "A project status update delivered to the team."
    }"#;

    #[test]
    fn test_valid_response_passes() {
        let analysis = parse_and_validate(VALID).unwrap();
        assert_eq!(analysis.clarity_score, 82);
        assert_eq!(
            analysis.communication_focus,
            "A project status update delivered to the team."
        );
    }

    #[test]
    fn test_segmented_transcript_passes() {
        let raw = r#"{
            "transcript": ["Thanks everyone", "for joining today."],
            "clarity_score": 90,
            "communication_focus": "A welcome."
        }"#;
        let analysis = parse_and_validate(raw).unwrap();
        assert_eq!(analysis.transcript.full_text(), "Thanks everyone for joining today.");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let raw = r#"{
            "transcript": "Hello.",
            "clarity_score": 50,
            "communication_focus": "A greeting.",
            "confidence": 0.93
        }"#;
        assert!(parse_and_validate(raw).is_ok());
    }

    #[test]
    fn test_out_of_range_score_is_rejected_not_clamped() {
        let raw = r#"{
            "transcript": "Hello.",
            "clarity_score": 150,
            "communication_focus": "A greeting."
        }"#;
        let err = parse_and_validate(raw).unwrap_err();
        assert!(matches!(err, KlarError::SchemaViolation(_)));
        assert!(err.to_string().contains("clarity_score"));
        assert!(err.to_string().contains("150"));
    }

    #[test]
    fn test_fractional_score_is_rejected() {
        let raw = r#"{
            "transcript": "Hello.",
            "clarity_score": 82.5,
            "communication_focus": "A greeting."
        }"#;
        let err = parse_and_validate(raw).unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }

    #[test]
    fn test_violations_are_aggregated() {
        let raw = r#"{
            "transcript": "",
            "clarity_score": -5,
            "communication_focus": "   "
        }"#;
        let err = parse_and_validate(raw).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("transcript"));
        assert!(msg.contains("clarity_score"));
        assert!(msg.contains("communication_focus"));
    }

    #[test]
    fn test_missing_field_is_named() {
        let raw = r#"{"transcript": "Hello.", "clarity_score": 70}"#;
        let err = parse_and_validate(raw).unwrap_err();
        assert!(err.to_string().contains("communication_focus: missing"));
    }

    #[test]
    fn test_overlong_focus_is_rejected() {
        let focus = "x".repeat(MAX_FOCUS_CHARS + 1);
        let raw = format!(
            r#"{{"transcript": "Hello.", "clarity_score": 70, "communication_focus": "{focus}"}}"#
        );
        let err = parse_and_validate(&raw).unwrap_err();
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn test_non_json_is_a_schema_violation() {
        let err = parse_and_validate("I'm sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, KlarError::SchemaViolation(_)));
    }

    #[test]
    fn test_non_object_is_a_schema_violation() {
        let err = parse_and_validate(r#"["not", "an", "object"]"#).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }
}
