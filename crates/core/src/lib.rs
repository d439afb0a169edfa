pub mod batch;
pub mod config;
pub mod icon;
pub mod job;
pub mod metrics;
pub mod packager;
pub mod testing;
pub mod version_info;

pub use batch::{
    BatchCoordinator, BatchError, BatchEvent, BatchId, BatchSnapshot, BatchSummary,
    CoordinatorConfig, JobView,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LoggingConfig,
    ServerConfig,
};
pub use icon::{IconConverter, IconError, IconKind, ImageIconConverter};
pub use job::{
    BatchSettings, BuildMode, JobEvent, JobEventKind, JobHandle, JobId, JobOutcome, JobReport,
    JobRequest, JobRunner, JobState, ValidationError,
};
pub use packager::{
    Packager, PackagerConfig, PackagerError, PackagerProcess, PyInstallerPackager,
    ToolAvailability,
};
pub use version_info::{FileVersion, ParseVersionError, VersionInfo};
