use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Error types for the conflab loader.
///
/// Covers everything that can abort a load or fail an operation on the
/// resolved view. Conditions that are deliberately silent (a missing
/// candidate file, no remote settings) are not represented here.
#[derive(Error, Debug)]
pub enum ConflabError {
    /// A source file exists but does not hold valid JSON
    #[error("failed to parse JSON at '{}': {details}", location.display())]
    Parse {
        /// Path of the offending file
        location: PathBuf,
        /// Parser error details
        details: String,
    },

    /// A source file exists but could not be read
    #[error("I/O error on '{}': {details}", path.display())]
    Io {
        /// Path where the I/O error occurred
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// Additional files include each other
    #[error("circular include detected: {chain}")]
    CircularInclude {
        /// Human readable include chain, e.g. `default.json -> a.json -> default.json`
        chain: String,
    },

    /// A required remote operation failed while remote sync is configured
    #[error("remote store unavailable during {operation}: {details}")]
    RemoteUnavailable {
        /// The operation that failed (canary write, fetch, watch)
        operation: String,
        /// Underlying client error
        details: String,
    },

    /// Remote sync is configured but no service name could be discovered
    #[error("remote sync requires a service name but none could be discovered")]
    MissingServiceName,

    /// A path does not address a value in the view
    #[error("invalid config path: {0}")]
    InvalidPath(String),

    /// A value could not be converted to the requested type
    #[error("failed to convert '{path}' to {expected}: {details}")]
    Conversion {
        /// Path of the value being converted
        path: String,
        /// Name of the requested type
        expected: &'static str,
        /// Deserializer error details
        details: String,
    },

    /// The loader was stopped before the load finished
    #[error("loader was stopped before the load completed")]
    Stopped,

    /// An earlier load on this instance failed
    #[error("configuration load previously failed: {0}")]
    LoadFailed(String),
}

/// A specialized `Result` type for conflab operations.
pub type Result<T> = std::result::Result<T, ConflabError>;

impl ConflabError {
    /// Creates a parse error for the given file.
    ///
    /// # Arguments
    ///
    /// * `error` - The underlying parser error
    /// * `path` - Path to the file that failed to parse
    pub fn parse(error: impl fmt::Display, path: &Path) -> Self {
        ConflabError::Parse {
            location: clean_path(path),
            details: error.to_string(),
        }
    }

    /// Creates an I/O error with file path context.
    pub fn io(error: impl fmt::Display, path: &Path) -> Self {
        ConflabError::Io {
            path: clean_path(path),
            details: error.to_string(),
        }
    }

    /// Creates a remote error for a required operation.
    pub fn remote(operation: &str, error: impl fmt::Display) -> Self {
        ConflabError::RemoteUnavailable {
            operation: operation.to_string(),
            details: error.to_string(),
        }
    }
}

fn clean_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
