//! Icon normalization.
//!
//! The packaging tool only understands `.ico` files. A `.png` icon is
//! converted into a multi-resolution icon (256, 128, 64, 48, 32 and 16 px)
//! through an [`IconConverter`] before the tool runs.

mod error;
mod raster;
mod traits;
mod types;

pub use error::IconError;
pub use raster::ImageIconConverter;
pub use traits::IconConverter;
pub use types::{IconKind, ICON_SIZES};
