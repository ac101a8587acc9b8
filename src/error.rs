use thiserror::Error;

/// Errors raised while building behaviour trees and loading configuration
///
/// The per-tick runtime never returns these: missing zones, groups or
/// characters degrade to sentinel values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    #[error("Unknown node type: {0}")]
    UnknownNode(String),

    #[error("Unknown condition: {0}")]
    UnknownCondition(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Unknown steering: {0}")]
    UnknownSteering(String),

    #[error("Invalid parameters for {kind}: {reason}")]
    InvalidParameters { kind: String, reason: String },

    #[error("Invalid child count for {kind}: expected {expected}, got {actual}")]
    InvalidChildCount {
        kind: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("Syntax error at offset {offset} in '{input}': {reason}")]
    Syntax {
        input: String,
        offset: usize,
        reason: String,
    },

    #[error("Invalid tree description: {0}")]
    InvalidTree(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AiError {
    pub(crate) fn invalid_parameters(kind: &str, reason: impl Into<String>) -> Self {
        AiError::InvalidParameters {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AiError>;

/// Failure reported by a task action
///
/// The task node maps it to `TreeNodeStatus::Exception` instead of letting it
/// escape the tick.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task {task} failed: {reason}")]
    Failed { task: String, reason: String },

    #[error("Character {0} not found")]
    CharacterNotFound(i32),
}
