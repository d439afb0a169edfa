//! Batch coordinator: runs one job per script and aggregates their events.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock, Semaphore};
use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::types::{BatchError, BatchEvent, BatchId, BatchSnapshot, BatchSummary, JobView};
use crate::job::{
    build_requests, BatchSettings, JobEvent, JobEventKind, JobHandle, JobId, JobOutcome,
    JobRequest, JobRunner,
};
use crate::metrics;

/// Requests sent to the view task besides job events.
#[derive(Debug)]
enum Control {
    CancelRequested,
}

/// What the coordinator keeps about the running batch.
struct ActiveBatch {
    batch_id: BatchId,
    handles: Vec<JobHandle>,
    control: mpsc::UnboundedSender<Control>,
}

/// Runs batches of jobs, one batch at a time.
///
/// The aggregate view is written by a single task per batch that drains the
/// jobs' event channel; everything else only reads it.
pub struct BatchCoordinator {
    config: CoordinatorConfig,
    runner: JobRunner,
    semaphore: Option<Arc<Semaphore>>,
    view: Arc<RwLock<Option<BatchSnapshot>>>,
    active: Arc<Mutex<Option<ActiveBatch>>>,
    events: broadcast::Sender<BatchEvent>,
    busy: Arc<watch::Sender<bool>>,
}

impl BatchCoordinator {
    pub fn new(config: CoordinatorConfig, runner: JobRunner) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let (busy, _) = watch::channel(false);
        let semaphore = config
            .concurrency_limit()
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            config,
            runner,
            semaphore,
            view: Arc::new(RwLock::new(None)),
            active: Arc::new(Mutex::new(None)),
            events,
            busy: Arc::new(busy),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Validates every script, then starts one job per script.
    ///
    /// Nothing is launched if any script is rejected. Returns the initial
    /// snapshot with every job `Pending`.
    pub async fn submit(
        &self,
        scripts: &[PathBuf],
        settings: &BatchSettings,
    ) -> Result<BatchSnapshot, BatchError> {
        let requests = build_requests(scripts, settings).inspect_err(|e| {
            metrics::BATCHES_REJECTED
                .with_label_values(&["validation"])
                .inc();
            info!("Rejected batch: {}", e);
        })?;

        // Claim the coordinator; fails if a batch is still running
        let claimed = self.busy.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        if !claimed {
            metrics::BATCHES_REJECTED.with_label_values(&["busy"]).inc();
            return Err(BatchError::BatchInProgress);
        }

        Ok(self.start(requests).await)
    }

    async fn start(&self, requests: Vec<JobRequest>) -> BatchSnapshot {
        let batch_id = BatchId::new();
        let jobs: Vec<JobView> = requests.iter().map(JobView::pending).collect();
        let job_ids: Vec<JobId> = jobs.iter().map(|j| j.job_id.clone()).collect();

        let snapshot = BatchSnapshot {
            batch_id,
            started_at: Utc::now(),
            finished_at: None,
            complete: false,
            cancel_requested: false,
            summary: BatchSummary {
                total: jobs.len(),
                ..Default::default()
            },
            jobs,
        };
        *self.view.write().await = Some(snapshot.clone());

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let handles: Vec<JobHandle> = requests.iter().map(|_| JobHandle::new()).collect();

        *self.active.lock().await = Some(ActiveBatch {
            batch_id,
            handles: handles.clone(),
            control: control_tx,
        });

        metrics::BATCHES_SUBMITTED.inc();
        info!(batch = %batch_id, jobs = requests.len(), "Starting batch");
        let _ = self.events.send(BatchEvent::BatchStarted {
            batch_id,
            jobs: job_ids,
        });

        // The view task starts before any job so no event is missed
        tokio::spawn(
            ViewTask {
                batch_id,
                view: self.view.clone(),
                active: self.active.clone(),
                events: self.events.clone(),
                busy: self.busy.clone(),
            }
            .run(event_rx, control_rx),
        );

        for (request, handle) in requests.into_iter().zip(handles) {
            let runner = self.runner.clone();
            let semaphore = self.semaphore.clone();
            let tx = event_tx.clone();
            tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                runner.run(request, handle, tx).await;
            });
        }

        snapshot
    }

    /// Stops every job of the running batch.
    ///
    /// Returns immediately; the batch completes once every job has actually
    /// reached a terminal state.
    pub async fn cancel_all(&self) -> Result<BatchId, BatchError> {
        let active = self.active.lock().await;
        let batch = active.as_ref().ok_or(BatchError::NoActiveBatch)?;

        info!(batch = %batch.batch_id, "Cancelling batch");
        // Queued before any job can finish because of it
        let _ = batch.control.send(Control::CancelRequested);
        for handle in &batch.handles {
            handle.stop();
        }
        Ok(batch.batch_id)
    }

    /// Latest view of the current or most recent batch.
    pub async fn snapshot(&self) -> Option<BatchSnapshot> {
        self.view.read().await.clone()
    }

    /// Subscribes to batch events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    /// Whether a batch is running.
    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Waits until no batch is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.busy.subscribe();
        // Only fails if the sender is gone, which cannot happen while `self` lives
        let _ = rx.wait_for(|busy| !*busy).await;
    }
}

/// Single writer of the aggregate view for one batch.
struct ViewTask {
    batch_id: BatchId,
    view: Arc<RwLock<Option<BatchSnapshot>>>,
    active: Arc<Mutex<Option<ActiveBatch>>>,
    events: broadcast::Sender<BatchEvent>,
    busy: Arc<watch::Sender<bool>>,
}

impl ViewTask {
    async fn run(
        self,
        mut job_events: mpsc::UnboundedReceiver<JobEvent>,
        mut control: mpsc::UnboundedReceiver<Control>,
    ) {
        let index: HashMap<JobId, usize> = match self.view.read().await.as_ref() {
            Some(snapshot) => snapshot
                .jobs
                .iter()
                .enumerate()
                .map(|(i, job)| (job.job_id.clone(), i))
                .collect(),
            None => HashMap::new(),
        };

        loop {
            if self.is_complete().await {
                break;
            }

            tokio::select! {
                biased;
                Some(Control::CancelRequested) = control.recv() => {
                    self.mark_cancel_requested().await;
                }
                event = job_events.recv() => match event {
                    Some(event) => self.apply(&index, event).await,
                    // Every job task is gone without finishing
                    None => {
                        self.fail_unfinished().await;
                        break;
                    }
                },
            }
        }

        self.complete().await;
    }

    async fn is_complete(&self) -> bool {
        self.view
            .read()
            .await
            .as_ref()
            .is_none_or(|snapshot| snapshot.summary.is_complete())
    }

    async fn apply(&self, index: &HashMap<JobId, usize>, event: JobEvent) {
        {
            let mut view = self.view.write().await;
            let Some(snapshot) = view.as_mut() else {
                return;
            };
            let Some(job) = index
                .get(&event.job_id)
                .and_then(|i| snapshot.jobs.get_mut(*i))
            else {
                warn!(job = %event.job_id, "Event for unknown job");
                return;
            };

            match &event.kind {
                JobEventKind::StateChanged { state } => job.state = *state,
                JobEventKind::Status { line } => job.log.push(line.clone()),
                JobEventKind::Progress { percent } => job.progress = *percent,
                JobEventKind::Finished { outcome } => {
                    if job.outcome.is_none() {
                        job.state = outcome.state();
                        job.outcome = Some(outcome.clone());
                        snapshot.summary.record(outcome);
                    }
                }
            }
        }

        let _ = self.events.send(BatchEvent::Job {
            batch_id: self.batch_id,
            event,
        });
    }

    async fn mark_cancel_requested(&self) {
        if let Some(snapshot) = self.view.write().await.as_mut() {
            snapshot.cancel_requested = true;
        }
        let _ = self.events.send(BatchEvent::CancelRequested {
            batch_id: self.batch_id,
        });
    }

    async fn fail_unfinished(&self) {
        let mut view = self.view.write().await;
        let Some(snapshot) = view.as_mut() else {
            return;
        };
        for job in snapshot.jobs.iter_mut().filter(|job| job.outcome.is_none()) {
            warn!(job = %job.job_id, "Job ended without a result");
            let outcome = JobOutcome::failed("job ended unexpectedly");
            job.state = outcome.state();
            snapshot.summary.record(&outcome);
            job.outcome = Some(outcome);
        }
    }

    async fn complete(self) {
        let summary = {
            let mut view = self.view.write().await;
            match view.as_mut() {
                Some(snapshot) => {
                    snapshot.complete = true;
                    snapshot.finished_at = Some(Utc::now());
                    snapshot.summary
                }
                None => BatchSummary::default(),
            }
        };

        info!(
            batch = %self.batch_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Batch complete"
        );

        // Announced before going idle, so the next batch's events follow it
        let _ = self.events.send(BatchEvent::BatchCompleted {
            batch_id: self.batch_id,
            summary,
        });

        *self.active.lock().await = None;
        self.busy.send_replace(false);
        debug!(batch = %self.batch_id, "Coordinator idle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::script;
    use crate::testing::{MockIconConverter, MockPackager, MockRun};
    use std::time::Duration;

    fn coordinator(packager: &Arc<MockPackager>, config: CoordinatorConfig) -> BatchCoordinator {
        let runner = JobRunner::new(packager.clone(), Arc::new(MockIconConverter::new()));
        BatchCoordinator::new(config, runner)
    }

    #[tokio::test]
    async fn test_single_job_batch() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        let coordinator = coordinator(&packager, CoordinatorConfig::default());

        let initial = coordinator
            .submit(&[script(dir.path(), "a.py")], &BatchSettings::default())
            .await
            .unwrap();
        assert_eq!(initial.jobs.len(), 1);
        assert!(!initial.complete);

        coordinator.wait_idle().await;
        let snapshot = coordinator.snapshot().await.unwrap();
        assert!(snapshot.complete);
        assert_eq!(snapshot.summary.succeeded, 1);
        assert_eq!(snapshot.jobs[0].progress, 100);
        assert!(!snapshot.jobs[0].log.is_empty());
    }

    #[tokio::test]
    async fn test_completion_is_broadcast_before_idle() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        let coordinator = coordinator(&packager, CoordinatorConfig::default());
        let mut events = coordinator.subscribe();

        coordinator
            .submit(&[script(dir.path(), "a.py")], &BatchSettings::default())
            .await
            .unwrap();
        coordinator.wait_idle().await;

        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(BatchEvent::BatchCompleted { .. })));
    }

    #[tokio::test]
    async fn test_rejects_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        packager.set_default_run(MockRun::endless()).await;
        let coordinator = coordinator(&packager, CoordinatorConfig::default());

        coordinator
            .submit(&[script(dir.path(), "a.py")], &BatchSettings::default())
            .await
            .unwrap();
        assert!(coordinator.is_busy());

        let err = coordinator
            .submit(&[script(dir.path(), "b.py")], &BatchSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::BatchInProgress));

        coordinator.cancel_all().await.unwrap();
        coordinator.wait_idle().await;
        assert!(!coordinator.is_busy());
    }

    #[tokio::test]
    async fn test_cancel_without_batch() {
        let packager = Arc::new(MockPackager::new());
        let coordinator = coordinator(&packager, CoordinatorConfig::default());
        assert!(matches!(
            coordinator.cancel_all().await,
            Err(BatchError::NoActiveBatch)
        ));
        assert!(coordinator.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_launches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        let coordinator = coordinator(&packager, CoordinatorConfig::default());
        let settings = BatchSettings {
            file_version: Some("1.0".to_string()),
            ..Default::default()
        };

        let err = coordinator
            .submit(&[script(dir.path(), "a.py")], &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Validation(_)));
        assert!(!coordinator.is_busy());
        assert!(packager.launches().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_cap() {
        let dir = tempfile::tempdir().unwrap();
        let packager = Arc::new(MockPackager::new());
        packager
            .set_default_run(
                MockRun::success(["Analyzing", "Building"])
                    .with_line_delay(Duration::from_millis(20)),
            )
            .await;
        let coordinator = coordinator(
            &packager,
            CoordinatorConfig::default().with_max_concurrent_jobs(1),
        );

        let scripts = vec![
            script(dir.path(), "a.py"),
            script(dir.path(), "b.py"),
            script(dir.path(), "c.py"),
        ];
        coordinator
            .submit(&scripts, &BatchSettings::default())
            .await
            .unwrap();
        coordinator.wait_idle().await;

        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.summary.succeeded, 3);
        assert_eq!(packager.launches().await.len(), 3);
    }
}
