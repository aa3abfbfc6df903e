use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, JoinError>;

/// A single form field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the field (`title`, `dueDate`, `category`)
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    #[error("Invalid task status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Invalid task ID format: {0}")]
    InvalidTaskId(String),

    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote store returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Request to {path} timed out")]
    Timeout { path: String },

    #[error("Malformed record at {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    #[error("Task counter kept changing underneath us after {attempts} attempts")]
    CounterContention { attempts: u32 },

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl JoinError {
    /// Whether the remote store client may retry the request that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(err) => !err.is_builder() && !err.is_decode(),
            _ => false,
        }
    }

    pub(crate) fn malformed(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
