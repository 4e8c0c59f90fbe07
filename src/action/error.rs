// ActionError - Failure taxonomy of the action engine

/// Result type for edit and action operations
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors that can occur while performing or undoing an action
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// Programmer error: double execute, undo before done, missing sound,
    /// capture into an occupied scratch slot
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Dialog cancel, progress cancel or factory self-cancel
    #[error("Cancelled by user")]
    Cancelled,

    /// Validation failure meant for the operator; an empty message fails silently
    #[error("{0}")]
    User(String),

    /// Anything else, surfaced verbatim
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ActionError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for user errors that must not be shown
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::User(message) if message.is_empty())
    }
}

impl From<std::io::Error> for ActionError {
    fn from(error: std::io::Error) -> Self {
        Self::Unexpected(error.to_string())
    }
}
