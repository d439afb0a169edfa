//! PyInstaller-based packager implementation.

use async_trait::async_trait;
use std::io::{BufRead, Read};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::config::PackagerConfig;
use super::error::PackagerError;
use super::traits::{Packager, PackagerProcess, ToolAvailability};

/// Packager that drives PyInstaller as a child process.
pub struct PyInstallerPackager {
    config: PackagerConfig,
    tool: Mutex<ToolState>,
}

/// What earlier availability checks found out.
#[derive(Default)]
struct ToolState {
    /// Version reported by the last successful check.
    version: Option<String>,
    /// Why the one install attempt failed. Never retried.
    install_error: Option<String>,
}

impl PyInstallerPackager {
    /// Creates a new packager with the given configuration.
    pub fn new(config: PackagerConfig) -> Self {
        Self {
            config,
            tool: Mutex::new(ToolState::default()),
        }
    }

    /// Creates a packager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PackagerConfig::default())
    }

    /// Builds a command from an argv-style list.
    fn command(argv: &[String]) -> Result<Command, PackagerError> {
        let (program, rest) = argv.split_first().ok_or(PackagerError::EmptyCommand)?;
        let mut cmd = Command::new(program);
        cmd.args(rest).stdin(Stdio::null());
        Ok(cmd)
    }

    /// Runs `<tool> --version` and returns the trimmed output.
    async fn detect_version(&self) -> Result<String, PackagerError> {
        let output = Self::command(&self.config.tool_command)?
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PackagerError::ToolNotFound {
                        command: self.config.tool_command.join(" "),
                    }
                } else {
                    PackagerError::Io(e)
                }
            })?;

        if !output.status.success() {
            debug!(
                "Version check failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(PackagerError::ToolNotFound {
                command: self.config.tool_command.join(" "),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Runs the configured install command once.
    async fn install(&self) -> Result<(), PackagerError> {
        info!(
            "Installing packaging tool: {}",
            self.config.install_command.join(" ")
        );

        let output = Self::command(&self.config.install_command)?
            .output()
            .await
            .map_err(|e| PackagerError::install_failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or_default().trim();
            return Err(PackagerError::install_failed(format!(
                "install command exited with code {:?}: {}",
                output.status.code(),
                last_line
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Packager for PyInstallerPackager {
    fn name(&self) -> &str {
        "PyInstaller"
    }

    async fn ensure_available(&self) -> Result<ToolAvailability, PackagerError> {
        // Held across the check so concurrent jobs install at most once
        let mut tool = self.tool.lock().await;
        if let Some(version) = tool.version.as_ref() {
            return Ok(ToolAvailability::Detected {
                version: version.clone(),
            });
        }

        match self.detect_version().await {
            Ok(version) => {
                tool.version = Some(version.clone());
                Ok(ToolAvailability::Detected { version })
            }
            Err(_) if tool.install_error.is_some() => Err(PackagerError::install_failed(
                tool.install_error.clone().unwrap_or_default(),
            )),
            Err(e) if self.config.auto_install => {
                warn!("Packaging tool unavailable ({}), attempting install", e);
                let installed = match self.install().await {
                    Ok(()) => self.detect_version().await,
                    Err(e) => Err(e),
                };
                match installed {
                    Ok(version) => {
                        tool.version = Some(version.clone());
                        Ok(ToolAvailability::Installed { version })
                    }
                    Err(e) => {
                        let reason = match e {
                            PackagerError::InstallFailed { reason } => reason,
                            other => other.to_string(),
                        };
                        tool.install_error = Some(reason.clone());
                        Err(PackagerError::install_failed(reason))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn launch(&self, args: &[String]) -> Result<Box<dyn PackagerProcess>, PackagerError> {
        // One pipe for both streams keeps lines in the order the tool wrote them
        let (reader, writer) = std::io::pipe()?;
        let stderr_writer = writer.try_clone()?;

        let child = Self::command(&self.config.tool_command)?
            .args(args)
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PackagerError::ToolNotFound {
                        command: self.config.tool_command.join(" "),
                    }
                } else {
                    PackagerError::spawn_failed(e.to_string())
                }
            })?;
        // The temporary command is gone, so EOF arrives when the tool exits

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::task::spawn_blocking(move || forward_lines(reader, tx));

        Ok(Box::new(ChildProcess { child, lines: rx }))
    }

    fn describe_command(&self, args: &[String]) -> String {
        self.config
            .tool_command
            .iter()
            .chain(args)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reads `reader` line by line until EOF, tolerating non-UTF-8 output.
fn forward_lines<R: Read>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut reader = std::io::BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Stopped reading tool output: {}", e);
                break;
            }
        }
    }
}

/// A spawned packaging process.
struct ChildProcess {
    child: Child,
    lines: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl PackagerProcess for ChildProcess {
    async fn next_line(&mut self) -> Result<Option<String>, PackagerError> {
        Ok(self.lines.recv().await)
    }

    async fn kill(&mut self) -> Result<(), PackagerError> {
        self.child.kill().await?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<Option<i32>, PackagerError> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}
