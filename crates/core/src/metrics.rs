//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (starts, outcomes, durations, icon conversions)
//! - Batches (submissions, rejections)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs started.
pub static JOBS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("exeforge_jobs_started_total", "Total packaging jobs started").unwrap()
});

/// Jobs currently between start and terminal state.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("exeforge_jobs_active", "Packaging jobs currently running").unwrap()
});

/// Jobs finished by outcome.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("exeforge_jobs_finished_total", "Total packaging jobs finished"),
        &["outcome"], // "succeeded", "failed", "cancelled"
    )
    .unwrap()
});

/// Job duration in seconds, from start to cleanup.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "exeforge_job_duration_seconds",
            "Duration of packaging jobs",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["outcome"],
    )
    .unwrap()
});

/// PNG to ICO conversions by result.
pub static ICON_CONVERSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "exeforge_icon_conversions_total",
            "Total icon conversions",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Batches
// =============================================================================

/// Batches accepted for execution.
pub static BATCHES_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("exeforge_batches_submitted_total", "Total batches started").unwrap()
});

/// Batches rejected before any job started.
pub static BATCHES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("exeforge_batches_rejected_total", "Total batches rejected"),
        &["reason"], // "validation", "busy"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_ACTIVE.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(ICON_CONVERSIONS.clone()),
        // Batches
        Box::new(BATCHES_SUBMITTED.clone()),
        Box::new(BATCHES_REJECTED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        JOBS_FINISHED.with_label_values(&["succeeded"]).inc();
        assert!(registry
            .gather()
            .iter()
            .any(|family| family.get_name() == "exeforge_jobs_finished_total"));
    }
}
