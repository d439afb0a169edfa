//! Runs a single job from preparation to cleanup.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::args::build_args;
use super::artifacts::TempArtifacts;
use super::progress::ProgressTracker;
use super::request::JobRequest;
use super::types::{
    JobError, JobEvent, JobEventKind, JobEventSender, JobId, JobOutcome, JobReport, JobState,
};
use crate::icon::IconConverter;
use crate::metrics;
use crate::packager::{Packager, PackagerError, PackagerProcess, ToolAvailability};
use crate::version_info::VersionInfo;

/// Cooperative cancellation flag shared between a job and its owners.
///
/// Stopping only sets the flag. The job notices it before launching the tool
/// and on every output line, then kills the tool.
#[derive(Debug, Clone, Default)]
pub struct JobHandle {
    stopped: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Calling it more than once has no further effect.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Mutable state of one running job. Owned by the task running it.
struct JobContext {
    job_id: JobId,
    state: JobState,
    progress: ProgressTracker,
    log: Vec<String>,
    events: JobEventSender,
}

impl JobContext {
    fn new(job_id: JobId, events: JobEventSender) -> Self {
        Self {
            job_id,
            state: JobState::Pending,
            progress: ProgressTracker::new(),
            log: Vec::new(),
            events,
        }
    }

    fn emit(&self, kind: JobEventKind) {
        // Observers may have gone away; the job still runs to completion
        let _ = self.events.send(JobEvent {
            job_id: self.job_id.clone(),
            kind,
        });
    }

    fn transition(&mut self, next: JobState) {
        if !self.state.can_transition_to(next) {
            warn!(
                job = %self.job_id,
                "Ignoring invalid transition {} -> {}",
                self.state,
                next
            );
            return;
        }
        debug!(job = %self.job_id, "{} -> {}", self.state, next);
        self.state = next;
        self.emit(JobEventKind::StateChanged { state: next });
    }

    fn status(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.log.push(line.clone());
        self.emit(JobEventKind::Status { line });
    }

    fn raise_progress(&mut self, percent: u8) {
        if let Some(percent) = self.progress.raise(percent) {
            self.emit(JobEventKind::Progress { percent });
        }
    }

    /// Records one line of tool output.
    fn output(&mut self, line: String) {
        info!(target: "job_output", job = %self.job_id, "{}", line);
        let progress = self.progress.observe(&line);
        self.status(line);
        if let Some(percent) = progress {
            self.emit(JobEventKind::Progress { percent });
        }
    }

    fn finish(mut self, outcome: JobOutcome) -> JobReport {
        if matches!(outcome, JobOutcome::Succeeded { .. }) {
            self.raise_progress(100);
        }
        self.transition(outcome.state());
        self.emit(JobEventKind::Finished {
            outcome: outcome.clone(),
        });

        JobReport {
            job_id: self.job_id,
            outcome,
            progress: self.progress.current(),
            log: self.log,
        }
    }
}

/// Runs jobs against a packaging tool and an icon converter.
#[derive(Clone)]
pub struct JobRunner {
    packager: Arc<dyn Packager>,
    icons: Arc<dyn IconConverter>,
    timeout: Option<Duration>,
}

impl JobRunner {
    pub fn new(packager: Arc<dyn Packager>, icons: Arc<dyn IconConverter>) -> Self {
        Self {
            packager,
            icons,
            timeout: None,
        }
    }

    /// Kills the tool and fails the job when a run takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn packager(&self) -> &Arc<dyn Packager> {
        &self.packager
    }

    /// Runs one job to its terminal state.
    ///
    /// Never fails: every fault ends up in the report's outcome. Temporary
    /// files are removed before the final `Finished` event is sent.
    pub async fn run(
        &self,
        request: JobRequest,
        handle: JobHandle,
        events: JobEventSender,
    ) -> JobReport {
        let started = Instant::now();
        metrics::JOBS_STARTED.inc();
        metrics::JOBS_ACTIVE.inc();

        let mut job = JobContext::new(request.job_id(), events);
        let mut artifacts = TempArtifacts::new();
        info!(job = %job.job_id, "Starting job");
        job.transition(JobState::Preparing);

        let outcome = match self
            .execute(&request, &handle, &mut job, &mut artifacts)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(job = %job.job_id, "Job failed: {}", e);
                job.status(format!("Error: {e}"));
                JobOutcome::failed(e.to_string())
            }
        };

        for line in artifacts.cleanup().await {
            job.status(line);
        }

        let label = outcome.label();
        info!(job = %job.job_id, outcome = label, "Job finished");
        let report = job.finish(outcome);

        metrics::JOBS_ACTIVE.dec();
        metrics::JOBS_FINISHED.with_label_values(&[label]).inc();
        metrics::JOB_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        report
    }

    async fn execute(
        &self,
        request: &JobRequest,
        handle: &JobHandle,
        job: &mut JobContext,
        artifacts: &mut TempArtifacts,
    ) -> Result<JobOutcome, JobError> {
        if handle.is_stopped() {
            job.status("Conversion cancelled before start.");
            return Ok(JobOutcome::Cancelled);
        }

        match self.packager.ensure_available().await {
            Ok(ToolAvailability::Detected { version }) => {
                job.status(format!("{} {} detected.", self.packager.name(), version));
            }
            Ok(ToolAvailability::Installed { version }) => {
                job.status(format!(
                    "{} was missing and has been installed ({}).",
                    self.packager.name(),
                    version
                ));
            }
            Err(e) => {
                job.status(format!("{} is unavailable: {}", self.packager.name(), e));
                return Err(JobError::ToolUnavailable(e));
            }
        }

        let icon = self.prepare_icon(request, job, artifacts).await;
        let version_file = self.prepare_version_file(request, job, artifacts).await?;

        if handle.is_stopped() {
            job.status("Conversion cancelled before start.");
            return Ok(JobOutcome::Cancelled);
        }

        let args = build_args(request, icon.as_deref(), version_file.as_deref());
        job.status(format!(
            "Running: {}",
            self.packager.describe_command(&args)
        ));
        job.transition(JobState::Running);

        let mut process = self.packager.launch(&args).await?;

        let Some(limit) = self.timeout else {
            return self.drive(request, handle, job, process.as_mut()).await;
        };

        let result =
            tokio::time::timeout(limit, self.drive(request, handle, job, process.as_mut())).await;
        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                if let Err(e) = process.kill().await {
                    warn!(job = %job.job_id, "Failed to kill timed out tool: {}", e);
                }
                Err(PackagerError::Timeout {
                    secs: limit.as_secs(),
                }
                .into())
            }
        }
    }

    /// Converts a `.png` icon. Failures are reported and the job goes on without an icon.
    async fn prepare_icon(
        &self,
        request: &JobRequest,
        job: &mut JobContext,
        artifacts: &mut TempArtifacts,
    ) -> Option<PathBuf> {
        let icon = request.icon.as_ref()?;
        if !icon.kind.needs_conversion() {
            return Some(icon.path.clone());
        }

        let dest = request.converted_icon_path();
        job.status("PNG icon detected, converting to ICO...");
        artifacts.record(&dest);

        match self.icons.to_ico(&icon.path, &dest).await {
            Ok(()) => {
                metrics::ICON_CONVERSIONS
                    .with_label_values(&["success"])
                    .inc();
                job.status("Icon converted.");
                Some(dest)
            }
            Err(e) => {
                metrics::ICON_CONVERSIONS
                    .with_label_values(&["failure"])
                    .inc();
                warn!(job = %job.job_id, "Icon conversion failed: {}", e);
                job.status(format!(
                    "Icon conversion failed, continuing without an icon: {e}"
                ));
                None
            }
        }
    }

    async fn prepare_version_file(
        &self,
        request: &JobRequest,
        job: &mut JobContext,
        artifacts: &mut TempArtifacts,
    ) -> Result<Option<PathBuf>, JobError> {
        if !request.wants_version_file() {
            return Ok(None);
        }

        let path = request.version_file_path();
        let info = VersionInfo::new(
            request.file_version,
            request.exe_name.clone(),
            request.copyright_info.as_deref(),
        );

        artifacts.record(&path);
        tokio::fs::write(&path, info.render()).await?;
        job.status("Generated version info file.");
        Ok(Some(path))
    }

    /// Consumes tool output until the process ends or the job is stopped.
    async fn drive(
        &self,
        request: &JobRequest,
        handle: &JobHandle,
        job: &mut JobContext,
        process: &mut dyn PackagerProcess,
    ) -> Result<JobOutcome, JobError> {
        while let Some(line) = process.next_line().await? {
            if handle.is_stopped() {
                if let Err(e) = process.kill().await {
                    warn!(job = %job.job_id, "Failed to kill cancelled tool: {}", e);
                }
                job.status("Conversion cancelled by user.");
                return Ok(JobOutcome::Cancelled);
            }
            job.output(line);
        }

        match process.wait().await? {
            Some(0) => {
                let exe_path = request.expected_exe_path();
                match tokio::fs::metadata(&exe_path).await {
                    Ok(meta) if meta.is_file() => {
                        let size_kb = meta.len() / 1024;
                        job.status(format!(
                            "Conversion succeeded: {} ({} KB)",
                            exe_path.display(),
                            size_kb
                        ));
                        Ok(JobOutcome::Succeeded { exe_path, size_kb })
                    }
                    _ => {
                        job.status(format!(
                            "Tool finished but {} was not found.",
                            exe_path.display()
                        ));
                        Ok(JobOutcome::failed("completed but output not found"))
                    }
                }
            }
            Some(code) => {
                let reason = format!("packaging tool exited with code {code}");
                job.status(format!("Conversion failed: {reason}"));
                Ok(JobOutcome::Failed { reason })
            }
            None => {
                let reason = "packaging tool was terminated by a signal".to_string();
                job.status(format!("Conversion failed: {reason}"));
                Ok(JobOutcome::Failed { reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::BatchSettings;
    use crate::testing::{MockIconConverter, MockPackager, MockRun};
    use tokio::sync::mpsc;

    fn script(dir: &std::path::Path) -> JobRequest {
        let path = dir.join("app.py");
        std::fs::write(&path, "print('hi')").unwrap();
        JobRequest::from_settings(&path, &BatchSettings::default()).unwrap()
    }

    fn runner(packager: &Arc<MockPackager>) -> JobRunner {
        JobRunner::new(packager.clone(), Arc::new(MockIconConverter::new()))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<JobEvent>) -> Vec<JobEventKind> {
        let mut kinds = vec![];
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }

    #[test]
    fn test_handle_stop_is_idempotent() {
        let handle = JobHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stopped());
        clone.stop();
        clone.stop();
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_event_order_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let request = script(dir.path());
        let packager = Arc::new(MockPackager::new());
        packager
            .set_default_run(MockRun::success(["Analyzing app.py", "Building EXE"]))
            .await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let report = runner(&packager)
            .run(request, JobHandle::new(), tx)
            .await;
        assert!(matches!(report.outcome, JobOutcome::Succeeded { .. }));
        assert_eq!(report.progress, 100);

        let kinds = drain(&mut rx);
        let states: Vec<JobState> = kinds
            .iter()
            .filter_map(|k| match k {
                JobEventKind::StateChanged { state } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![JobState::Preparing, JobState::Running, JobState::Succeeded]
        );
        let progress: Vec<u8> = kinds
            .iter()
            .filter_map(|k| match k {
                JobEventKind::Progress { percent } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![30, 70, 100]);
        assert!(matches!(kinds.last(), Some(JobEventKind::Finished { .. })));
    }

    #[tokio::test]
    async fn test_tool_unavailable_never_launches() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        packager.set_available(false).await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner(&packager)
            .run(script(dir.path()), JobHandle::new(), tx)
            .await;

        assert_eq!(report.outcome, JobOutcome::failed("tool unavailable"));
        assert!(packager.launches().await.is_empty());
    }

    #[tokio::test]
    async fn test_stopped_before_start_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        let handle = JobHandle::new();
        handle.stop();

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner(&packager)
            .run(script(dir.path()), handle, tx)
            .await;

        assert_eq!(report.outcome, JobOutcome::Cancelled);
        assert!(packager.launches().await.is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        packager
            .set_default_run(MockRun::failure(["Analyzing", "ERROR: boom"], 1))
            .await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner(&packager)
            .run(script(dir.path()), JobHandle::new(), tx)
            .await;

        assert_eq!(
            report.outcome,
            JobOutcome::failed("packaging tool exited with code 1")
        );
        assert_eq!(report.progress, 30);
        assert!(report.log.iter().any(|l| l == "ERROR: boom"));
    }

    #[tokio::test]
    async fn test_missing_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        packager
            .set_default_run(MockRun::success(["done"]).without_output())
            .await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner(&packager)
            .run(script(dir.path()), JobHandle::new(), tx)
            .await;

        assert_eq!(
            report.outcome,
            JobOutcome::failed("completed but output not found")
        );
    }

    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        packager.set_default_run(MockRun::endless()).await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = runner(&packager)
            .with_timeout(Duration::from_millis(100))
            .run(script(dir.path()), JobHandle::new(), tx)
            .await;

        match report.outcome {
            JobOutcome::Failed { reason } => assert!(reason.contains("timed out")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(packager.kill_count().await, 1);
    }
}
