//! Mock icon converter for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::icon::{IconConverter, IconError, IconKind};

/// Mock implementation of the IconConverter trait.
///
/// Writes a small placeholder file at the destination. When set to fail,
/// it still leaves a partial file behind, like an interrupted write would.
#[derive(Debug, Default)]
pub struct MockIconConverter {
    fail: Arc<RwLock<bool>>,
    conversions: Arc<RwLock<Vec<(PathBuf, PathBuf)>>>,
}

impl MockIconConverter {
    /// Create a new mock icon converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following conversion fail.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Source and destination of every conversion attempt.
    pub async fn conversions(&self) -> Vec<(PathBuf, PathBuf)> {
        self.conversions.read().await.clone()
    }
}

#[async_trait]
impl IconConverter for MockIconConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn to_ico(&self, source: &Path, dest: &Path) -> Result<(), IconError> {
        IconKind::from_path(source)?;
        self.conversions
            .write()
            .await
            .push((source.to_path_buf(), dest.to_path_buf()));

        if *self.fail.read().await {
            tokio::fs::write(dest, b"\0\0").await?;
            return Err(IconError::encode("mock conversion failure"));
        }

        tokio::fs::write(dest, b"\0\0\x01\0mock-ico").await?;
        Ok(())
    }
}
