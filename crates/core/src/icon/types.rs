//! Types for the icon module.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::IconError;

/// Pixel sizes written into every generated icon, largest first.
pub const ICON_SIZES: [u32; 6] = [256, 128, 64, 48, 32, 16];

/// Image formats accepted as an executable icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    /// Needs conversion before the packaging tool can use it.
    Png,
    /// Passed to the packaging tool as is.
    Ico,
}

impl IconKind {
    /// Classifies an icon by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self, IconError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("ico") => Ok(Self::Ico),
            _ => Err(IconError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Whether the icon has to be converted to `.ico` first.
    pub fn needs_conversion(self) -> bool {
        matches!(self, Self::Png)
    }
}
