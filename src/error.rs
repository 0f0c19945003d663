use thiserror::Error;
use tracing::{error, warn};

/// Error severity for host display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,     // informational
    Warning,  // recoverable
    Error,    // operation failed
    Critical, // requires user action
}

/// Domain-specific errors for the expansion engine and its stores
#[derive(Error, Debug)]
pub enum ExpanderError {
    #[error("Failed to access state document '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode state document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("State store error: {0}")]
    Store(String),

    #[error("File watch error: {0}")]
    Watch(String),

    #[error("Invalid control request: {0}")]
    Protocol(String),
}

impl ExpanderError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Io { .. } => ErrorSeverity::Error,
            Self::Json(_) => ErrorSeverity::Error,
            Self::Store(_) => ErrorSeverity::Error,
            Self::Watch(_) => ErrorSeverity::Warning,
            Self::Protocol(_) => ErrorSeverity::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Io { path, .. } => format!("Could not access {}", path),
            Self::Json(e) => format!("Invalid state document: {}", e),
            Self::Store(msg) => format!("State store issue: {}", msg),
            Self::Watch(msg) => format!("File watcher issue: {}", msg),
            Self::Protocol(msg) => format!("Invalid request: {}", msg),
        }
    }
}

impl From<notify::Error> for ExpanderError {
    fn from(e: notify::Error) -> Self {
        Self::Watch(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExpanderError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and the user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use cue_expander::error::ResultExt;
///
/// // Keep serving with the previous snapshot if the refresh fails
/// let snapshot = cache.refresh().log_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
