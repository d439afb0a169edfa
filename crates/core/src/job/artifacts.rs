//! Temporary files a job creates next to its script.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Files to delete once the job ends, whatever its outcome.
#[derive(Debug, Default)]
pub struct TempArtifacts {
    paths: Vec<PathBuf>,
}

impl TempArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file before it is written, so a partial write is cleaned up too.
    pub fn record(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Deletes every recorded file that exists.
    ///
    /// Returns one status line per removal attempt. Failures are logged and
    /// reported in the returned lines, never raised.
    pub async fn cleanup(self) -> Vec<String> {
        let mut lines = Vec::new();
        for path in self.paths {
            if let Some(line) = remove(&path).await {
                lines.push(line);
            }
        }
        lines
    }
}

async fn remove(path: &Path) -> Option<String> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Some(format!("Removed temporary file {}", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Failed to remove temporary file {}: {}", path.display(), e);
            Some(format!(
                "Could not remove temporary file {}: {}",
                path.display(),
                e
            ))
        }
    }
}
