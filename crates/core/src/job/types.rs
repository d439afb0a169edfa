//! Types for the job orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::packager::PackagerError;

/// Identity of a job: the script it converts.
///
/// Unique within a batch; two jobs for the same script never run together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn from_script(script: &Path) -> Self {
        Self(script.display().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the produced executable allocates a console window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Windowed executable, no console.
    #[default]
    Gui,
    /// Console executable.
    Console,
}

impl BuildMode {
    /// The packaging tool flag selecting this mode.
    pub fn flag(self) -> &'static str {
        match self {
            BuildMode::Gui => "--windowed",
            BuildMode::Console => "--console",
        }
    }
}

/// Lifecycle of a single job.
///
/// `Pending → Preparing → Running → {Succeeded | Failed | Cancelled}`.
/// Preparation may also end the job directly as `Failed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Preparing,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }

    /// Whether moving from `self` to `next` goes forward through the state machine.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match (self, next) {
            (JobState::Pending, JobState::Preparing) => true,
            (JobState::Preparing, JobState::Running) => true,
            (JobState::Preparing, JobState::Failed | JobState::Cancelled) => true,
            (JobState::Running, next) => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Preparing => "preparing",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded {
        exe_path: PathBuf,
        /// Size of the executable in whole kilobytes, rounded down.
        size_kb: u64,
    },
    Failed {
        reason: String,
    },
    Cancelled,
}

impl JobOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Succeeded { .. } => JobState::Succeeded,
            JobOutcome::Failed { .. } => JobState::Failed,
            JobOutcome::Cancelled => JobState::Cancelled,
        }
    }

    /// Label used for metrics and log fields.
    pub fn label(&self) -> &'static str {
        self.state().as_str()
    }
}

/// Something that happened to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEventKind {
    /// The job moved to a new state.
    StateChanged { state: JobState },
    /// A line was appended to the job log.
    Status { line: String },
    /// Estimated progress went up.
    Progress { percent: u8 },
    /// The job reached its terminal state. Always the last event of a job.
    Finished { outcome: JobOutcome },
}

/// A job event tagged with the job it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    #[serde(flatten)]
    pub kind: JobEventKind,
}

/// Channel a job publishes its events on.
pub type JobEventSender = mpsc::UnboundedSender<JobEvent>;

/// Everything a finished job leaves behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub outcome: JobOutcome,
    /// Progress when the job ended.
    pub progress: u8,
    /// Every status line, in order.
    pub log: Vec<String>,
}

/// Faults that end a job as `Failed`.
#[derive(Debug, Error)]
pub enum JobError {
    /// The packaging tool is missing and could not be installed.
    #[error("tool unavailable")]
    ToolUnavailable(#[source] PackagerError),

    /// The packaging tool failed while running.
    #[error("{0}")]
    Packager(#[from] PackagerError),

    /// Writing a prepared file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use JobState::*;
        assert!(Pending.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Running));
        assert!(Preparing.can_transition_to(Failed));
        assert!(Preparing.can_transition_to(Cancelled));
        assert!(Running.can_transition_to(Succeeded));
        assert!(Running.can_transition_to(Failed));
        assert!(Running.can_transition_to(Cancelled));
    }

    #[test]
    fn test_no_backward_or_terminal_transitions() {
        use JobState::*;
        assert!(!Preparing.can_transition_to(Pending));
        assert!(!Running.can_transition_to(Preparing));
        assert!(!Pending.can_transition_to(Running));
        assert!(!Preparing.can_transition_to(Succeeded));
        for terminal in [Succeeded, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Pending, Preparing, Running, Succeeded, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_build_mode_flag() {
        assert_eq!(BuildMode::Gui.flag(), "--windowed");
        assert_eq!(BuildMode::Console.flag(), "--console");
        assert_eq!(BuildMode::default(), BuildMode::Gui);
    }

    #[test]
    fn test_outcome_state() {
        assert_eq!(JobOutcome::Cancelled.state(), JobState::Cancelled);
        assert_eq!(JobOutcome::failed("boom").label(), "failed");
    }

    #[test]
    fn test_event_serialization() {
        let event = JobEvent {
            job_id: JobId::from_script(Path::new("/src/app.py")),
            kind: JobEventKind::Progress { percent: 30 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["job_id"], "/src/app.py");
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percent"], 30);

        let back: JobEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = JobOutcome::Succeeded {
            exe_path: PathBuf::from("/out/app.exe"),
            size_kb: 2000,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["size_kb"], 2000);
    }

    #[test]
    fn test_tool_unavailable_message() {
        let err = JobError::ToolUnavailable(PackagerError::install_failed("no network"));
        assert_eq!(err.to_string(), "tool unavailable");
    }
}
