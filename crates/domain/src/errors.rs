//! Error types used throughout the client layer

use serde_json::Value;
use thiserror::Error;

/// Main error type for fhirbridge
#[derive(Error, Debug)]
pub enum FhirError {
    /// Authentication bootstrap or refresh failed, or the authorization
    /// retry bound was exhausted.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered 404 or 410 for the requested resource.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-2xx response, carrying either a structured
    /// OperationOutcome resource or the raw response text.
    #[error("Operation outcome: {}", operation_outcome_message(.resource, .reason))]
    OperationOutcome {
        resource: Option<Value>,
        reason: Option<String>,
    },

    /// A partner declares support for a strategy that has no registered
    /// exchange implementation. Configuration bug, never retried.
    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),

    /// Caller contract violation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Token or payload decoding failed.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Bug or broken invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FhirError {
    /// Build an [`FhirError::OperationOutcome`] from a raw response body.
    ///
    /// A body that parses to a JSON object with
    /// `resourceType == "OperationOutcome"` is kept structured; anything
    /// else (other resource types, malformed JSON, plain text) is carried
    /// as the raw reason text.
    #[must_use]
    pub fn outcome_from_body(body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<Value>(body) {
            if parsed.get("resourceType").and_then(Value::as_str) == Some("OperationOutcome") {
                return Self::OperationOutcome { resource: Some(parsed), reason: None };
            }
        }
        Self::OperationOutcome { resource: None, reason: Some(body.to_string()) }
    }
}

fn operation_outcome_message(resource: &Option<Value>, reason: &Option<String>) -> String {
    match (resource, reason) {
        (Some(resource), _) => resource.to_string(),
        (None, Some(reason)) => reason.clone(),
        (None, None) => "unknown".to_string(),
    }
}

/// Result type alias for fhirbridge operations
pub type Result<T> = std::result::Result<T, FhirError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_outcome_body_is_kept_as_resource() {
        let body = r#"{"resourceType":"OperationOutcome","issue":[{"severity":"error"}]}"#;
        match FhirError::outcome_from_body(body) {
            FhirError::OperationOutcome { resource: Some(resource), reason: None } => {
                assert_eq!(resource["resourceType"], "OperationOutcome");
            }
            other => panic!("expected structured outcome, got {other:?}"),
        }
    }

    #[test]
    fn other_resource_types_fall_back_to_raw_reason() {
        let body = r#"{"resourceType":"Patient","id":"p1"}"#;
        match FhirError::outcome_from_body(body) {
            FhirError::OperationOutcome { resource: None, reason: Some(reason) } => {
                assert!(reason.contains("Patient"));
            }
            other => panic!("expected raw reason, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_falls_back_to_raw_reason() {
        let body = "upstream exploded";
        match FhirError::outcome_from_body(body) {
            FhirError::OperationOutcome { resource: None, reason: Some(reason) } => {
                assert_eq!(reason, "upstream exploded");
            }
            other => panic!("expected raw reason, got {other:?}"),
        }
    }

    #[test]
    fn display_includes_classification() {
        let err = FhirError::Unauthorized("Can not get access token".into());
        assert_eq!(err.to_string(), "Unauthorized: Can not get access token");
    }
}
