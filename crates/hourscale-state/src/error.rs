//! Error kinds reported by policy and workload collaborators.

use thiserror::Error;

/// Result type alias for collaborator operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a collaborator can report.
///
/// The reconciler never retries any of these in-process. Retryable kinds
/// are retried by re-invocation from whoever schedules reconciles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced policy or workload does not exist (anymore).
    #[error("not found: {0}")]
    NotFound(String),

    /// A concurrent writer changed the object since it was read.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached or answered garbage.
    #[error("transport error: {0}")]
    Transport(String),

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Whether a later reconcile has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_) | StoreError::Transport(_))
    }

    /// Short machine-friendly name of the kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Conflict(_) => "conflict",
            StoreError::Transport(_) => "transport",
            StoreError::Cancelled => "cancelled",
        }
    }
}

/// A single invalid field found by [`crate::ScalingPolicy::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the offending field, e.g. `spec.start`.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Admission-time rejection of a policy. Never produced by reconciliation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid policy {object}: {}", render_fields(.errors))]
pub struct ValidationError {
    pub object: String,
    pub errors: Vec<FieldError>,
}

fn render_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_fields() {
        let err = ValidationError {
            object: "ops/p".into(),
            errors: vec![
                FieldError::new("spec.start", "24 is outside 0..=23"),
                FieldError::new("spec.replicas", "-1 must not be negative"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid policy ops/p: spec.start: 24 is outside 0..=23; spec.replicas: -1 must not be negative"
        );
    }

    #[test]
    fn conflict_and_transport_are_retryable() {
        assert!(StoreError::Conflict("web".into()).is_retryable());
        assert!(StoreError::Transport("timeout".into()).is_retryable());
        assert!(!StoreError::NotFound("web".into()).is_retryable());
        assert!(!StoreError::Cancelled.is_retryable());
    }

    #[test]
    fn display_includes_detail() {
        let err = StoreError::NotFound("ns-a/web".into());
        assert_eq!(err.to_string(), "not found: ns-a/web");
        assert_eq!(err.kind(), "not_found");
    }
}
