//! Unified engine error, aggregating bus/storage/stage failures over
//! `taleforge_domain::DomainError` the way the teacher's `InfraError`
//! aggregates `RepoError`/`LlmError`/`QueueError` (spec.md §7).

use taleforge_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("bus lock timed out after {attempts} attempts")]
    LockTimeout { attempts: u32 },

    #[error("operation timed out")]
    Timeout,

    #[error("unhandled effect op {0:?}")]
    UnhandledEffect(String),

    #[error("effect parse error: {0}")]
    EffectParse(#[from] taleforge_shared::EffectParseError),

    #[error("session mismatch: expected {expected}, got {actual}")]
    SessionMismatch { expected: String, actual: String },

    #[error("internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Domain(d) => d.kind(),
            EngineError::LockTimeout { .. } => "lock_timeout",
            EngineError::Timeout => "timeout",
            EngineError::UnhandledEffect(_) => "unhandled_effect",
            EngineError::EffectParse(_) => "parse_error",
            EngineError::SessionMismatch { .. } => "session_mismatch",
            EngineError::Internal(_) => "internal",
        }
    }

    pub fn user_sentence(&self) -> String {
        match self {
            EngineError::Domain(d) => d.user_sentence(),
            EngineError::Timeout => "That took too long.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_kind_passes_through() {
        let err: EngineError = DomainError::OutOfRange("melee".into()).into();
        assert_eq!(err.kind(), "out_of_range");
        assert_eq!(err.user_sentence(), "Target out of range.");
    }

    #[test]
    fn lock_timeout_kind_matches_spec() {
        let err = EngineError::LockTimeout { attempts: 10 };
        assert_eq!(err.kind(), "lock_timeout");
    }
}
