//! Trait definitions for the packager module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::PackagerError;

/// How the packaging tool was found to be available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolAvailability {
    /// The tool was already present.
    Detected { version: String },
    /// The tool was missing and has just been installed.
    Installed { version: String },
}

impl ToolAvailability {
    /// The version string reported by the tool.
    pub fn version(&self) -> &str {
        match self {
            Self::Detected { version } | Self::Installed { version } => version,
        }
    }
}

/// An external tool that turns a script into a standalone executable.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Returns the name of this packager implementation.
    fn name(&self) -> &str;

    /// Checks that the tool can be run, installing it once if allowed.
    ///
    /// Concurrent callers share the same check; a successful result is cached.
    async fn ensure_available(&self) -> Result<ToolAvailability, PackagerError>;

    /// Starts the tool with the given arguments.
    async fn launch(&self, args: &[String]) -> Result<Box<dyn PackagerProcess>, PackagerError>;

    /// Renders the full command line for the job log.
    fn describe_command(&self, args: &[String]) -> String;
}

/// A running packaging process.
#[async_trait]
pub trait PackagerProcess: Send {
    /// Next line of merged stdout/stderr, without the line terminator.
    ///
    /// Returns `None` once both streams are closed.
    async fn next_line(&mut self) -> Result<Option<String>, PackagerError>;

    /// Forcefully terminates the process.
    async fn kill(&mut self) -> Result<(), PackagerError>;

    /// Waits for the process to exit. `None` means it was ended by a signal.
    async fn wait(&mut self) -> Result<Option<i32>, PackagerError>;
}
