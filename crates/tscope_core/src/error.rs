//! Error types for the listing pipeline.
//!
//! Only whole-listing failures surface here. Per-entry problems are logged
//! and the entry dropped; classification misses are not errors at all.

use std::io;
use std::path::PathBuf;

use tscope_hal::HalError;

/// Result type for TermScope core operations
pub type ScopeResult<T> = Result<T, ScopeError>;

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// The requested directory does not exist.
    #[error("{}: No such file or directory", .0.display())]
    NotFound(PathBuf),

    #[error("{}: Not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("{}: Permission denied", .0.display())]
    PermissionDenied(PathBuf),

    #[error("I/O error in {operation} on {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Hal(#[from] HalError),
}

impl ScopeError {
    /// Map an I/O failure on `path` to the most specific variant.
    pub fn from_io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => ScopeError::NotFound(path),
            io::ErrorKind::PermissionDenied => ScopeError::PermissionDenied(path),
            _ => ScopeError::Io {
                operation,
                path,
                source,
            },
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ScopeError::Config(message.into())
    }

    /// True when a UI should render its "directory not found" message.
    pub fn is_not_found(&self) -> bool {
        match self {
            ScopeError::NotFound(_) => true,
            ScopeError::Hal(err) => err.is_not_found(),
            _ => false,
        }
    }
}
