//! Trait definitions for the icon module.

use async_trait::async_trait;
use std::path::Path;

use super::error::IconError;

/// Produces a multi-resolution `.ico` file from a source image.
#[async_trait]
pub trait IconConverter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts `source` into an icon written at `dest`.
    ///
    /// An unsupported source format is reported as
    /// [`IconError::UnsupportedFormat`] without touching `dest`.
    async fn to_ico(&self, source: &Path, dest: &Path) -> Result<(), IconError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::IconKind;

    struct CopyConverter;

    #[async_trait]
    impl IconConverter for CopyConverter {
        fn name(&self) -> &str {
            "copy"
        }

        async fn to_ico(&self, source: &Path, dest: &Path) -> Result<(), IconError> {
            IconKind::from_path(source)?;
            tokio::fs::copy(source, dest).await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_converter_trait_object() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("logo.png");
        let dest = dir.path().join("logo.ico");
        tokio::fs::write(&source, b"png").await.unwrap();

        let converter: Box<dyn IconConverter> = Box::new(CopyConverter);
        converter.to_ico(&source, &dest).await.unwrap();
        assert!(dest.exists());

        let bad = dir.path().join("logo.gif");
        let err = converter.to_ico(&bad, &dest).await.unwrap_err();
        assert!(matches!(err, IconError::UnsupportedFormat { .. }));
    }
}
