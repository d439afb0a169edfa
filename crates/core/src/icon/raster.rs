//! Icon conversion backed by the `image` crate.

use async_trait::async_trait;
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::imageops::FilterType;
use image::ExtendedColorType;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

use super::error::IconError;
use super::traits::IconConverter;
use super::types::{IconKind, ICON_SIZES};

/// Converts PNG (or ICO) images into a multi-resolution ICO file.
#[derive(Debug, Default, Clone)]
pub struct ImageIconConverter;

impl ImageIconConverter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IconConverter for ImageIconConverter {
    fn name(&self) -> &str {
        "image"
    }

    async fn to_ico(&self, source: &Path, dest: &Path) -> Result<(), IconError> {
        IconKind::from_path(source)?;

        let source = source.to_path_buf();
        let dest = dest.to_path_buf();

        // Decoding and resampling are CPU bound
        tokio::task::spawn_blocking(move || encode_ico(&source, &dest))
            .await
            .map_err(|e| IconError::encode(format!("conversion task failed: {e}")))?
    }
}

fn encode_ico(source: &Path, dest: &Path) -> Result<(), IconError> {
    let img = image::open(source).map_err(|e| IconError::decode(e.to_string()))?;
    let longest = img.width().max(img.height());

    // No upscaling past the source resolution
    let mut sizes: Vec<u32> = ICON_SIZES.iter().copied().filter(|s| *s <= longest).collect();
    if sizes.is_empty() {
        sizes.push(ICON_SIZES[ICON_SIZES.len() - 1]);
    }

    let mut frames = Vec::with_capacity(sizes.len());
    for size in &sizes {
        let rgba = img.resize(*size, *size, FilterType::Lanczos3).to_rgba8();
        let frame = IcoFrame::as_png(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| IconError::encode(e.to_string()))?;
        frames.push(frame);
    }

    let writer = BufWriter::new(File::create(dest)?);
    IcoEncoder::new(writer)
        .encode_images(&frames)
        .map_err(|e| IconError::encode(e.to_string()))?;

    debug!("Wrote icon {} with sizes {:?}", dest.display(), sizes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn test_png_to_ico() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("logo.png");
        let dest = dir.path().join("logo.ico");
        RgbaImage::from_pixel(300, 300, Rgba([200, 40, 40, 255]))
            .save(&source)
            .unwrap();

        ImageIconConverter::new().to_ico(&source, &dest).await.unwrap();

        // The decoder picks the largest entry
        let icon = image::open(&dest).unwrap();
        assert_eq!(icon.width(), 256);
        assert_eq!(icon.height(), 256);
    }

    #[tokio::test]
    async fn test_small_source_keeps_smaller_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("small.png");
        let dest = dir.path().join("small.ico");
        RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]))
            .save(&source)
            .unwrap();

        ImageIconConverter::new().to_ico(&source, &dest).await.unwrap();

        let icon = image::open(&dest).unwrap();
        assert_eq!(icon.width(), 32);
    }

    #[tokio::test]
    async fn test_corrupt_png_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        let dest = dir.path().join("broken.ico");
        std::fs::write(&source, b"not a png").unwrap();

        let err = ImageIconConverter::new()
            .to_ico(&source, &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, IconError::Decode { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_unsupported_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageIconConverter::new()
            .to_ico(&dir.path().join("logo.bmp"), &dir.path().join("logo.ico"))
            .await
            .unwrap_err();
        assert!(matches!(err, IconError::UnsupportedFormat { .. }));
    }
}
