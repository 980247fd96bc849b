//! Error types for evaluation, protocol construction, and persistence.
//!
//! Defined in `qmtrainer-core` so callers can tell an input-shape failure
//! (nothing persisted, caller's fault) apart from a storage failure
//! (recoverable, already-persisted sessions stay valid).

use thiserror::Error;

use crate::model::SessionId;

/// A submitted record that does not fit the protocol or the feedback form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    /// The number of submitted steps differs from the protocol.
    #[error("expected {expected} steps, got {found}")]
    StepCountMismatch { expected: usize, found: usize },

    /// A submitted step name does not match the protocol at that position.
    #[error("step {position}: expected '{expected}', got '{found}'")]
    UnexpectedStep {
        position: usize,
        expected: String,
        found: String,
    },

    /// A manual entry names a step the protocol does not know.
    #[error("unknown step: {0}")]
    UnknownStep(String),

    /// A manual entry gives the same step more than one time.
    #[error("step '{0}' entered more than once")]
    DuplicateTime(String),

    /// The session ends before it starts.
    #[error("session ends before it starts ({total_secs}s)")]
    NegativeDuration { total_secs: i64 },

    /// The trainee identifier is blank.
    #[error("disponent must not be empty")]
    EmptyDisponent,

    /// A required feedback field is blank.
    #[error("feedback field '{0}' must not be empty")]
    EmptyFeedbackField(&'static str),
}

/// A protocol table that cannot be resolved into ordered steps.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("protocol has no steps")]
    Empty,

    #[error("duplicate step name: {0}")]
    DuplicateStep(String),

    /// An edge points at a step that is not part of the protocol.
    #[error("threshold edge targets unknown step: {0}")]
    UnknownTarget(String),

    /// An edge does not start at the step right before its target.
    #[error("threshold edge '{from}' -> '{to}' does not connect consecutive steps (expected from '{expected}')")]
    NotConsecutive {
        from: String,
        to: String,
        expected: String,
    },

    #[error("step '{0}' has more than one threshold edge")]
    DuplicateEdge(String),
}

/// Errors returned by a `SessionStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize stored session: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` if the error means the requested session does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::SessionNotFound(_))
    }
}
