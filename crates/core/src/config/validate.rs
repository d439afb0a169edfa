use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Packaging tool command is not empty
/// - Install command is not empty when auto-install is on
/// - Job timeout, when set, is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.packager.tool_command.is_empty() {
        return Err(ConfigError::ValidationError(
            "packager.tool_command cannot be empty".to_string(),
        ));
    }

    if config.packager.auto_install && config.packager.install_command.is_empty() {
        return Err(ConfigError::ValidationError(
            "packager.install_command cannot be empty when auto_install is enabled".to_string(),
        ));
    }

    if config.packager.job_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError(
            "packager.job_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
