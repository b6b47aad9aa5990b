//! Unified error type for the domain layer.
//!
//! Provides a common error type used across domain operations (target
//! resolution, intent lifecycle, rules application) so adapters never
//! have to reach for `String` or `anyhow` to report a domain failure.

use thiserror::Error;

/// Unified error type for domain operations, mapping 1:1 onto the
/// error kinds catalogued in spec.md §7.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("not found: {entity_type} {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("ambiguous target: {0}")]
    Ambiguous(String),

    #[error("target out of range: {0}")]
    OutOfRange(String),

    #[error("target not visible: {0}")]
    NotVisible(String),

    #[error("path blocked: {0}")]
    Blocked(String),

    #[error("connection requires a key: {0}")]
    RequiresKey(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unhandled effect: {0}")]
    UnhandledEffect(String),

    #[error("session mismatch: expected {expected}, got {actual}")]
    SessionMismatch { expected: String, actual: String },

    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// The error kind tag used in the `stage="failure"` Inbox message
    /// (spec.md §7's "User-visible behavior").
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTransition(_) => "invalid_transition",
            Self::NotFound { .. } => "not_found",
            Self::Ambiguous(_) => "ambiguous",
            Self::OutOfRange(_) => "out_of_range",
            Self::NotVisible(_) => "not_visible",
            Self::Blocked(_) => "blocked",
            Self::RequiresKey(_) => "requires_key",
            Self::Parse(_) => "parse_error",
            Self::UnhandledEffect(_) => "unhandled_effect",
            Self::SessionMismatch { .. } => "session_mismatch",
            Self::Validation(_) => "validation",
        }
    }

    /// A human sentence derived from the error kind, per spec.md §7.
    pub fn user_sentence(&self) -> String {
        match self {
            Self::OutOfRange(_) => "Target out of range.".to_string(),
            Self::NotVisible(_) => "Target not visible.".to_string(),
            Self::Ambiguous(what) => format!("Which {what} did you mean?"),
            Self::NotFound { entity_type, .. } => format!("No such {entity_type}."),
            Self::Blocked(_) => "The way is blocked.".to_string(),
            Self::RequiresKey(_) => "That requires a key.".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_match_spec_error_kinds() {
        assert_eq!(DomainError::OutOfRange("melee".into()).kind(), "out_of_range");
        assert_eq!(
            DomainError::not_found("npc", "123").kind(),
            "not_found"
        );
    }

    #[test]
    fn user_sentence_for_out_of_range() {
        let err = DomainError::OutOfRange("5 tiles".into());
        assert_eq!(err.user_sentence(), "Target out of range.");
    }
}
