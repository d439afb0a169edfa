//! Validation performed before any job starts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::request::{BatchSettings, JobRequest};
use crate::version_info::ParseVersionError;

/// Script extensions the packaging tool accepts.
pub const SCRIPT_EXTENSIONS: [&str; 2] = ["py", "pyw"];

/// A request that must not start.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no scripts selected")]
    NoScripts,

    #[error("script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("unsupported script: {} (expected .py or .pyw)", .0.display())]
    UnsupportedScript(PathBuf),

    #[error("unsupported icon format: {} (expected .png or .ico)", .0.display())]
    UnsupportedIcon(PathBuf),

    #[error("icon not found: {}", .0.display())]
    IconNotFound(PathBuf),

    #[error(transparent)]
    InvalidVersion(#[from] ParseVersionError),

    #[error("invalid executable name: '{0}'")]
    InvalidExeName(String),

    #[error("data file not found: {}", .0.display())]
    DataFileNotFound(PathBuf),

    #[error("script selected more than once: {}", .0.display())]
    DuplicateScript(PathBuf),

    #[error("more than one script would produce {}", .0.display())]
    DuplicateOutput(PathBuf),
}

/// Whether `path` has an accepted script extension, ignoring case.
pub fn is_supported_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SCRIPT_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Builds one request per script, rejecting the whole batch on the first problem.
pub fn build_requests(
    scripts: &[PathBuf],
    settings: &BatchSettings,
) -> Result<Vec<JobRequest>, ValidationError> {
    if scripts.is_empty() {
        return Err(ValidationError::NoScripts);
    }

    let mut seen_scripts = HashSet::new();
    let mut seen_outputs = HashSet::new();
    let mut requests = Vec::with_capacity(scripts.len());

    for script in scripts {
        let request = JobRequest::from_settings(script, settings)?;

        if !seen_scripts.insert(request.script_path.clone()) {
            return Err(ValidationError::DuplicateScript(request.script_path));
        }

        let exe_path = request.expected_exe_path();
        if !seen_outputs.insert(exe_path.clone()) {
            return Err(ValidationError::DuplicateOutput(exe_path));
        }

        requests.push(request);
    }

    Ok(requests)
}
