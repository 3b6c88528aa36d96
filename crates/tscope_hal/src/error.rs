//! Error handling for the TermScope HAL
//!
//! Filesystem and identity operations report failures through [`HalError`].
//! Callers in the listing pipeline treat most of these as per-entry
//! diagnostics rather than fatal conditions.

use std::io;
use std::path::{Path, PathBuf};

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    /// I/O operation failed
    #[error("I/O error in {operation} on {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Identity registry could not be read or parsed
    #[error("identity error in {operation}: {message}")]
    Identity {
        operation: &'static str,
        message: String,
    },
    /// Input rejected before touching the filesystem
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl HalError {
    pub fn io_error(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        HalError::Io {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn identity(operation: &'static str, message: impl Into<String>) -> Self {
        HalError::Identity {
            operation,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        HalError::Invalid(message.into())
    }

    /// Underlying `io::ErrorKind`, if this is an I/O failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            HalError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }
}
