use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty statement, unknown lesson or unknown exercise.
    InputError,
    /// The statement was refused before reaching the engine.
    PolicyViolation,
    /// The engine rejected the statement.
    ExecutionError,
    /// Dataset missing, copy failed, lesson content unreadable.
    ResourceError,
    ConfigError,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SQLError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SQLError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wraps an engine error, keeping only its natural-language text.
    pub fn execution(err: rusqlite::Error) -> Self {
        Self::new(ErrorKind::ExecutionError, err.to_string())
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceError, message)
    }

    pub fn is_resource(&self) -> bool {
        self.kind == ErrorKind::ResourceError
    }
}
