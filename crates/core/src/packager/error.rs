//! Error types for the packager module.

use thiserror::Error;

/// Errors raised while talking to the external packaging tool.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The configured command is empty.
    #[error("packaging tool command is empty")]
    EmptyCommand,

    /// The tool could not be started or reported failure on `--version`.
    #[error("packaging tool not found: {command}")]
    ToolNotFound { command: String },

    /// The one-time install did not succeed.
    #[error("failed to install packaging tool: {reason}")]
    InstallFailed { reason: String },

    /// The packaging process could not be spawned.
    #[error("failed to start packaging tool: {reason}")]
    SpawnFailed { reason: String },

    /// The packaging run exceeded the configured limit and was killed.
    #[error("packaging tool timed out after {secs}s")]
    Timeout { secs: u64 },

    /// I/O error while reading from or waiting on the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackagerError {
    /// Creates a new install failed error.
    pub fn install_failed(reason: impl Into<String>) -> Self {
        Self::InstallFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new spawn failed error.
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }
}
