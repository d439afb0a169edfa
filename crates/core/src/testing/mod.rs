//! Testing utilities and mock implementations.
//!
//! Mocks for the two external collaborators of a job, the packaging tool
//! and the icon converter, so jobs and batches can be exercised without
//! Python installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use exeforge_core::testing::{MockIconConverter, MockPackager, MockRun};
//!
//! let packager = Arc::new(MockPackager::new());
//! packager.set_run_for("slow", MockRun::default().with_line_delay(Duration::from_millis(50))).await;
//! packager.set_run_for("broken", MockRun::failure(["ERROR: boom"], 1)).await;
//!
//! let runner = JobRunner::new(packager.clone(), Arc::new(MockIconConverter::new()));
//! ```

mod mock_icon_converter;
mod mock_packager;

pub use mock_icon_converter::MockIconConverter;
pub use mock_packager::{MockPackager, MockRun};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    /// Writes a trivial script named `name` into `dir`.
    ///
    /// Returns the canonical path, the identity jobs are keyed by.
    pub fn script(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "print('hello')\n").unwrap_or_else(|e| {
            panic!("failed to write fixture script {}: {}", path.display(), e)
        });
        std::fs::canonicalize(&path).unwrap_or(path)
    }

    /// Path of the executable a job named `exe_name` writes into `dir`.
    pub fn exe_path(dir: &Path, exe_name: &str) -> PathBuf {
        dir.join(format!("{}{}", exe_name, std::env::consts::EXE_SUFFIX))
    }
}
