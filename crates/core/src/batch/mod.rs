//! Job coordinator: runs a batch of scripts concurrently.
//!
//! A batch is one job per script sharing the same [`BatchSettings`]. Every
//! script is validated before anything starts. Jobs run concurrently (or
//! under a configured cap) and never wait on one another. The batch is
//! complete once every job has reached a terminal state; only then can a new
//! batch be submitted.
//!
//! Observers either poll [`BatchCoordinator::snapshot`] or
//! [`subscribe`](BatchCoordinator::subscribe) to the event stream.
//!
//! [`BatchSettings`]: crate::job::BatchSettings

mod config;
mod coordinator;
mod types;

pub use config::CoordinatorConfig;
pub use coordinator::BatchCoordinator;
pub use types::{BatchError, BatchEvent, BatchId, BatchSnapshot, BatchSummary, JobView};
