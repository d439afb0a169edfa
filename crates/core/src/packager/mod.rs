//! Seam around the external packaging tool.
//!
//! The [`Packager`] trait hides how the tool is located, installed and
//! launched. [`PyInstallerPackager`] drives a real PyInstaller through
//! `tokio::process`; tests use `testing::MockPackager` instead.
//!
//! # Example
//!
//! ```ignore
//! use exeforge_core::packager::{Packager, PackagerConfig, PyInstallerPackager};
//!
//! let packager = PyInstallerPackager::new(PackagerConfig::default());
//! let availability = packager.ensure_available().await?;
//! println!("Using PyInstaller {}", availability.version());
//!
//! let mut process = packager.launch(&args).await?;
//! while let Some(line) = process.next_line().await? {
//!     println!("{line}");
//! }
//! let code = process.wait().await?;
//! ```

mod config;
mod error;
mod pyinstaller;
mod traits;

pub use config::PackagerConfig;
pub use error::PackagerError;
pub use pyinstaller::PyInstallerPackager;
pub use traits::{Packager, PackagerProcess, ToolAvailability};
