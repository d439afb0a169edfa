//! Mock packager for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::packager::{Packager, PackagerError, PackagerProcess, ToolAvailability};

/// Scripted behavior of one mock packaging run.
#[derive(Debug, Clone)]
pub struct MockRun {
    /// Output lines, in order.
    pub lines: Vec<String>,
    /// Exit code reported by `wait`. `None` simulates death by signal.
    pub exit_code: Option<i32>,
    /// Size of the executable written on a zero exit. `None` writes nothing.
    pub output_size: Option<u64>,
    /// Pause before each line.
    pub line_delay: Duration,
    /// Keep printing lines after the scripted ones until killed.
    pub endless: bool,
    /// Replaced with a directory on exit, so `remove_file` fails on it.
    pub blocked_path: Option<PathBuf>,
}

impl MockRun {
    /// A run that exits 0 and writes a 1 KB executable.
    pub fn success<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            exit_code: Some(0),
            output_size: Some(1024),
            line_delay: Duration::ZERO,
            endless: false,
            blocked_path: None,
        }
    }

    /// A run that exits with `code` and writes nothing.
    pub fn failure<I, S>(lines: I, code: i32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exit_code: Some(code),
            output_size: None,
            ..Self::success(lines)
        }
    }

    /// A run that never ends on its own.
    pub fn endless() -> Self {
        Self {
            endless: true,
            line_delay: Duration::from_millis(10),
            ..Self::success(["Analyzing app.py"])
        }
    }

    pub fn with_output_size(mut self, bytes: u64) -> Self {
        self.output_size = Some(bytes);
        self
    }

    /// Exit cleanly without producing the executable.
    pub fn without_output(mut self) -> Self {
        self.output_size = None;
        self
    }

    pub fn with_line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = delay;
        self
    }

    /// Swap `path` for a directory when the run exits.
    pub fn with_blocked_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.blocked_path = Some(path.into());
        self
    }
}

impl Default for MockRun {
    fn default() -> Self {
        Self::success([
            "INFO: Analyzing app.py",
            "INFO: Collecting submodules",
            "INFO: Building EXE from EXE-00.toc",
            "INFO: Build complete! The results are available in: dist",
        ])
    }
}

/// Mock implementation of the Packager trait.
///
/// Provides controllable behavior for testing:
/// - Script output, exit code and produced executable per run
/// - Override the run for a specific executable name
/// - Simulate a missing tool
/// - Track launches and kills for assertions
///
/// The executable is written on `wait()` at the path given by the
/// `--distpath` and `-n` arguments.
#[derive(Debug)]
pub struct MockPackager {
    available: Arc<RwLock<bool>>,
    default_run: Arc<RwLock<MockRun>>,
    /// Runs keyed by the `-n` argument.
    runs_by_name: Arc<RwLock<HashMap<String, MockRun>>>,
    launches: Arc<RwLock<Vec<Vec<String>>>>,
    ensure_calls: Arc<RwLock<usize>>,
    kills: Arc<RwLock<usize>>,
}

impl Default for MockPackager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPackager {
    /// Create a new mock packager.
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            default_run: Arc::new(RwLock::new(MockRun::default())),
            runs_by_name: Arc::new(RwLock::new(HashMap::new())),
            launches: Arc::new(RwLock::new(Vec::new())),
            ensure_calls: Arc::new(RwLock::new(0)),
            kills: Arc::new(RwLock::new(0)),
        }
    }

    /// Make `ensure_available` fail as if install did not work.
    pub async fn set_available(&self, available: bool) {
        *self.available.write().await = available;
    }

    /// Set the run used when no per-name run matches.
    pub async fn set_default_run(&self, run: MockRun) {
        *self.default_run.write().await = run;
    }

    /// Set the run for jobs producing `exe_name`.
    pub async fn set_run_for(&self, exe_name: impl Into<String>, run: MockRun) {
        self.runs_by_name.write().await.insert(exe_name.into(), run);
    }

    /// Argument lists of every launch, in order.
    pub async fn launches(&self) -> Vec<Vec<String>> {
        self.launches.read().await.clone()
    }

    /// Number of `ensure_available` calls.
    pub async fn ensure_calls(&self) -> usize {
        *self.ensure_calls.read().await
    }

    /// Number of processes killed.
    pub async fn kill_count(&self) -> usize {
        *self.kills.read().await
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[async_trait]
impl Packager for MockPackager {
    fn name(&self) -> &str {
        "mock"
    }

    async fn ensure_available(&self) -> Result<ToolAvailability, PackagerError> {
        *self.ensure_calls.write().await += 1;
        if *self.available.read().await {
            Ok(ToolAvailability::Detected {
                version: "0.0-mock".to_string(),
            })
        } else {
            Err(PackagerError::install_failed("mock tool is unavailable"))
        }
    }

    async fn launch(&self, args: &[String]) -> Result<Box<dyn PackagerProcess>, PackagerError> {
        self.launches.write().await.push(args.to_vec());

        let name = arg_value(args, "-n").map(str::to_string);
        let run = match &name {
            Some(name) => self.runs_by_name.read().await.get(name).cloned(),
            None => None,
        };
        let run = match run {
            Some(run) => run,
            None => self.default_run.read().await.clone(),
        };

        let output_path = match (arg_value(args, "--distpath"), name) {
            (Some(dir), Some(name)) => Some(
                PathBuf::from(dir).join(format!("{}{}", name, std::env::consts::EXE_SUFFIX)),
            ),
            _ => None,
        };

        Ok(Box::new(MockProcess {
            lines: run.lines.iter().cloned().collect(),
            run,
            output_path,
            killed: false,
            kills: self.kills.clone(),
        }))
    }

    fn describe_command(&self, args: &[String]) -> String {
        format!("mock {}", args.join(" "))
    }
}

/// A scripted packaging process.
struct MockProcess {
    lines: VecDeque<String>,
    run: MockRun,
    output_path: Option<PathBuf>,
    killed: bool,
    kills: Arc<RwLock<usize>>,
}

#[async_trait]
impl PackagerProcess for MockProcess {
    async fn next_line(&mut self) -> Result<Option<String>, PackagerError> {
        if self.killed {
            return Ok(None);
        }
        if self.lines.is_empty() && !self.run.endless {
            return Ok(None);
        }
        if !self.run.line_delay.is_zero() {
            tokio::time::sleep(self.run.line_delay).await;
        }
        Ok(Some(
            self.lines
                .pop_front()
                .unwrap_or_else(|| "INFO: still working...".to_string()),
        ))
    }

    async fn kill(&mut self) -> Result<(), PackagerError> {
        if !self.killed {
            self.killed = true;
            *self.kills.write().await += 1;
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<Option<i32>, PackagerError> {
        if let Some(path) = &self.run.blocked_path {
            if tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
                tokio::fs::remove_file(path).await?;
            }
            tokio::fs::create_dir_all(path).await?;
        }
        if self.killed {
            return Ok(None);
        }
        if let (Some(0), Some(size), Some(path)) =
            (self.run.exit_code, self.run.output_size, &self.output_path)
        {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let file = tokio::fs::File::create(path).await?;
            file.set_len(size).await?;
        }
        Ok(self.run.exit_code)
    }
}
