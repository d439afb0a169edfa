//! Job orchestrator: one script in, one executable (or a reason) out.
//!
//! A job walks `Pending → Preparing → Running → {Succeeded | Failed | Cancelled}`:
//!
//! - **Preparing** makes sure the packaging tool is available, converts a
//!   `.png` icon and writes the version descriptor when asked for.
//! - **Running** launches the tool, records every output line in the job log
//!   and estimates progress from it.
//! - Temporary files are removed on every terminal state.
//!
//! Cancellation is cooperative: [`JobHandle::stop`] sets a flag the job
//! checks before launching the tool and on every output line.
//!
//! # Example
//!
//! ```ignore
//! use exeforge_core::job::{BatchSettings, JobHandle, JobRequest, JobRunner};
//!
//! let request = JobRequest::from_settings(Path::new("/src/app.py"), &BatchSettings::default())?;
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let report = runner.run(request, JobHandle::new(), tx).await;
//! println!("{:?}", report.outcome);
//! ```

mod args;
mod artifacts;
mod progress;
mod request;
mod runner;
mod types;
mod validation;

pub use args::build_args;
pub use artifacts::TempArtifacts;
pub use progress::{estimate as estimate_progress, ProgressTracker};
pub use request::{parse_modules, split_args, BatchSettings, IconSource, JobRequest};
pub use runner::{JobHandle, JobRunner};
pub use types::{
    BuildMode, JobError, JobEvent, JobEventKind, JobEventSender, JobId, JobOutcome, JobReport,
    JobState,
};
pub use validation::{build_requests, is_supported_script, ValidationError, SCRIPT_EXTENSIONS};
