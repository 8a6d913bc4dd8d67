//! Structured error types for engine operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Identity
    NotAuthenticated,

    // Validation errors (user can correct input and retry)
    ValidationFailed,

    // Store errors (network/backend, retryable)
    StoreReadFailed,
    StoreWriteFailed,

    // Degradable reference errors
    UnresolvableReference,

    // Not found errors
    InspectionNotFound,
    TaskNotFound,

    // Lineage errors (abort the whole resolution)
    LineageCycle,
    LineageTooDeep,

    // Internal errors
    InternalError,
}

/// Structured error returned by every engine operation.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn not_authenticated(operation: &str) -> Self {
        Self::new(
            ErrorCode::NotAuthenticated,
            format!("No acting user available for {}", operation),
        )
    }

    /// A required input is missing; `field` names what the user must supply.
    pub fn missing(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::ValidationFailed, reason).with_field(field)
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, reason).with_field(field)
    }

    pub fn store_read(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StoreReadFailed, err.to_string())
    }

    pub fn store_write(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StoreWriteFailed, err.to_string())
    }

    pub fn unresolvable(kind: &str, id: &str) -> Self {
        Self::new(
            ErrorCode::UnresolvableReference,
            format!("Cannot map {} reference {}", kind, id),
        )
        .with_field(kind)
    }

    pub fn inspection_not_found(inspection_id: &str) -> Self {
        Self::new(
            ErrorCode::InspectionNotFound,
            format!("Inspection not found: {}", inspection_id),
        )
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn lineage_cycle(inspection_id: &str) -> Self {
        Self::new(
            ErrorCode::LineageCycle,
            format!(
                "Inspection {} appears twice in its own ancestor chain",
                inspection_id
            ),
        )
    }

    pub fn lineage_too_deep(leaf_id: &str, max_depth: usize) -> Self {
        Self::new(
            ErrorCode::LineageTooDeep,
            format!(
                "Ancestor chain of {} exceeds the maximum depth of {}",
                leaf_id, max_depth
            ),
        )
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// Store failures are the only errors worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::StoreReadFailed | ErrorCode::StoreWriteFailed
        )
    }

    /// Text suitable for showing to the person who triggered the operation.
    pub fn user_message(&self) -> String {
        match self.code {
            ErrorCode::ValidationFailed => match self.field {
                Some(ref field) => format!("{} ({} required)", self.message, field),
                None => self.message.clone(),
            },
            ErrorCode::StoreReadFailed | ErrorCode::StoreWriteFailed => {
                "The inspection store could not be reached. Please try again.".to_string()
            }
            ErrorCode::NotAuthenticated => "You must be signed in to do that.".to_string(),
            _ => self.message.clone(),
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        // Try to downcast to EngineError first
        match err.downcast::<EngineError>() {
            Ok(engine_err) => engine_err,
            Err(err) => EngineError::internal(err),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = EngineError::missing("note", "A note is required to fail a task");
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(
            err.user_message(),
            "A note is required to fail a task (note required)"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_errors_are_generic_and_retryable() {
        let err = EngineError::store_write("disk I/O error");
        assert!(err.is_retryable());
        assert!(!err.user_message().contains("disk"));
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_code() {
        let original = EngineError::task_not_found("t-1");
        let wrapped: anyhow::Error = original.into();
        let back = EngineError::from(wrapped);
        assert_eq!(back.code, ErrorCode::TaskNotFound);

        let plain = EngineError::from(anyhow::anyhow!("boom"));
        assert_eq!(plain.code, ErrorCode::InternalError);
    }

    #[test]
    fn test_serializes_screaming_snake_code() {
        let err = EngineError::lineage_too_deep("i-1", 4);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "LINEAGE_TOO_DEEP");
        assert!(json.get("field").is_none());
    }
}
