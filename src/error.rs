use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine-level error taxonomy.
///
/// Every variant maps to a stable machine-readable code via [`EngineError::code`];
/// the web layer translates codes to transport status, the engine never does.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No verified identity was supplied.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Identity is valid but lacks the capability for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    /// A state-machine guard rejected the attempted transition.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// Optimistic concurrency collision; safe to retry with fresh state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Collaborator failure (storage unavailable, timeout, corrupt record).
    #[error("internal error: {message}")]
    Internal { message: String, retryable: bool },
}

impl EngineError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            retryable: false,
        }
    }

    /// A transient collaborator failure, e.g. a timed-out repository call.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            retryable: true,
        }
    }

    /// Stable code exposed to callers; internal details stay in the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::Internal { retryable: true, .. }
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("serialization error: {e}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::internal(format!("io error: {e}"))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EngineError {
    fn from(e: rocksdb::Error) -> Self {
        Self::internal(format!("storage error: {e}"))
    }
}
