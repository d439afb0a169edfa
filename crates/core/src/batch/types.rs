//! Types for the batch coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::job::{JobEvent, JobId, JobOutcome, JobRequest, JobState, ValidationError};

/// Identifier of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors returned by the coordinator.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch was rejected before any job started.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another batch is still running.
    #[error("a batch is already in progress")]
    BatchInProgress,

    /// There is no running batch to act on.
    #[error("no batch is in progress")]
    NoActiveBatch,
}

/// Aggregate view of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: JobId,
    pub script_path: PathBuf,
    pub exe_name: String,
    pub state: JobState,
    pub progress: u8,
    pub log: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
}

impl JobView {
    pub fn pending(request: &JobRequest) -> Self {
        Self {
            job_id: request.job_id(),
            script_path: request.script_path.clone(),
            exe_name: request.exe_name.clone(),
            state: JobState::Pending,
            progress: 0,
            log: Vec::new(),
            outcome: None,
        }
    }
}

/// Counts of jobs per terminal outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    /// Jobs that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub fn is_complete(&self) -> bool {
        self.finished() == self.total
    }

    pub(crate) fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded { .. } => self.succeeded += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
            JobOutcome::Cancelled => self.cancelled += 1,
        }
    }
}

/// Point-in-time view of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch_id: BatchId,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Every job has reached a terminal state.
    pub complete: bool,
    pub cancel_requested: bool,
    pub jobs: Vec<JobView>,
    pub summary: BatchSummary,
}

impl BatchSnapshot {
    pub fn job(&self, job_id: &JobId) -> Option<&JobView> {
        self.jobs.iter().find(|job| &job.job_id == job_id)
    }
}

/// Events published to batch observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    BatchStarted {
        batch_id: BatchId,
        jobs: Vec<JobId>,
    },
    Job {
        batch_id: BatchId,
        event: JobEvent,
    },
    CancelRequested {
        batch_id: BatchId,
    },
    /// Every job is terminal and a new batch may be submitted.
    BatchCompleted {
        batch_id: BatchId,
        summary: BatchSummary,
    },
}
