//! Error types for the dispatcher

use thiserror::Error;

/// Main error type for dispatch, selection, and policy persistence
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No candidates: {available} agent(s) available, team of {team_size} required")]
    NoCandidates { available: usize, team_size: usize },

    #[error("Unauthorized: actor '{actor}' as '{role}' may not '{action}' on any candidate")]
    Unauthorized {
        actor: String,
        role: String,
        action: String,
    },

    #[error("Corrupt policy at line {line}: {reason}")]
    CorruptPolicy { line: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Whether retrying the same call could succeed without new input
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DispatchError::Io(_))
    }
}

/// Result type alias for dispatcher operations
pub type Result<T> = std::result::Result<T, DispatchError>;
