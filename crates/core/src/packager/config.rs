//! Configuration for the packager module.

use serde::{Deserialize, Serialize};

/// Configuration for the external packaging tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagerConfig {
    /// Program and leading arguments that invoke the packaging tool.
    #[serde(default = "default_tool_command")]
    pub tool_command: Vec<String>,

    /// Command run once when the tool is missing.
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,

    /// Whether to try `install_command` when the tool is missing.
    #[serde(default = "default_auto_install")]
    pub auto_install: bool,

    /// Hard limit for a single packaging run in seconds. Unset means no limit.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,
}

fn default_python() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

fn default_tool_command() -> Vec<String> {
    vec![
        default_python().to_string(),
        "-m".to_string(),
        "PyInstaller".to_string(),
    ]
}

fn default_install_command() -> Vec<String> {
    vec![
        default_python().to_string(),
        "-m".to_string(),
        "pip".to_string(),
        "install".to_string(),
        "pyinstaller".to_string(),
    ]
}

fn default_auto_install() -> bool {
    true
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            tool_command: default_tool_command(),
            install_command: default_install_command(),
            auto_install: default_auto_install(),
            job_timeout_secs: None,
        }
    }
}

impl PackagerConfig {
    /// Creates a config that invokes the tool through the given command.
    pub fn with_tool_command<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool_command: command.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets the install command.
    pub fn with_install_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables the one-time install.
    pub fn with_auto_install(mut self, enabled: bool) -> Self {
        self.auto_install = enabled;
        self
    }

    /// Sets the per-job timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.job_timeout_secs = Some(timeout_secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PackagerConfig::default();
        assert_eq!(config.tool_command.len(), 3);
        assert_eq!(config.tool_command[1], "-m");
        assert_eq!(config.tool_command[2], "PyInstaller");
        assert_eq!(config.install_command.last().unwrap(), "pyinstaller");
        assert!(config.auto_install);
        assert_eq!(config.job_timeout_secs, None);
    }

    #[test]
    fn test_config_builder() {
        let config = PackagerConfig::with_tool_command(["/usr/bin/pyinstaller"])
            .with_install_command(["pipx", "install", "pyinstaller"])
            .with_auto_install(false)
            .with_timeout(900);

        assert_eq!(config.tool_command, vec!["/usr/bin/pyinstaller"]);
        assert_eq!(config.install_command, vec!["pipx", "install", "pyinstaller"]);
        assert!(!config.auto_install);
        assert_eq!(config.job_timeout_secs, Some(900));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PackagerConfig = toml::from_str("auto_install = false").unwrap();
        assert!(!config.auto_install);
        assert_eq!(config.tool_command, default_tool_command());
    }
}
