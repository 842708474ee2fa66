use thiserror::Error;

use crate::{ConflabError, remote::RemoteError};

/// Errors that can occur during CLI command execution.
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid arguments were provided to a command.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Loading the configuration failed.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConflabError),

    /// The remote store rejected a request or could not be reached.
    #[error("Remote error: {0}")]
    RemoteError(#[from] RemoteError),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    OutputError(#[from] serde_json::Error),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Type alias for command execution results.
///
/// Commands return the text to print on success.
pub type CommandResult = Result<String, CliError>;
