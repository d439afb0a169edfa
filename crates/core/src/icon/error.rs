//! Error types for the icon module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while normalizing an icon.
#[derive(Debug, Error)]
pub enum IconError {
    /// Only `.png` and `.ico` images are accepted.
    #[error("unsupported icon format: {path} (expected .png or .ico)")]
    UnsupportedFormat { path: PathBuf },

    /// The source image could not be read or decoded.
    #[error("failed to decode icon source: {reason}")]
    Decode { reason: String },

    /// The multi-resolution icon could not be written.
    #[error("failed to encode icon: {reason}")]
    Encode { reason: String },

    /// I/O error while writing the icon file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IconError {
    /// Creates a new decode error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Creates a new encode error.
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }
}
