//! Job requests and the batch-wide settings they are derived from.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use super::types::{BuildMode, JobId};
use super::validation::{is_supported_script, ValidationError};
use crate::icon::IconKind;
use crate::version_info::FileVersion;

/// Settings shared by every script of a batch, as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub mode: BuildMode,
    /// Defaults to each script's own directory.
    pub output_dir: Option<PathBuf>,
    /// Defaults to each script's base name.
    pub exe_name: Option<String>,
    /// A `.png` or `.ico` image.
    pub icon_path: Option<PathBuf>,
    /// `W.X.Y.Z`. Present but malformed values are rejected, an empty string included.
    pub file_version: Option<String>,
    pub copyright_info: Option<String>,
    /// Comma-separated module names to force-include.
    pub extra_modules: String,
    /// Additional tool flags, split on whitespace.
    pub extra_args: String,
    /// Extra files bundled next to the executable.
    pub data_files: Vec<PathBuf>,
}

/// Splits a comma-separated module list, dropping blanks and repeats.
pub fn parse_modules(input: &str) -> Vec<String> {
    let mut modules: Vec<String> = Vec::new();
    for module in input.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        if !modules.iter().any(|m| m == module) {
            modules.push(module.to_string());
        }
    }
    modules
}

/// Splits free-form extra flags on whitespace.
pub fn split_args(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

/// A validated, fully resolved request to package one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Absolute path of the script.
    pub script_path: PathBuf,
    pub mode: BuildMode,
    pub output_dir: PathBuf,
    pub exe_name: String,
    pub icon: Option<IconSource>,
    pub file_version: Option<FileVersion>,
    pub copyright_info: Option<String>,
    pub extra_modules: Vec<String>,
    pub extra_args: Vec<String>,
    pub data_files: Vec<PathBuf>,
}

/// Icon chosen for the executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSource {
    pub path: PathBuf,
    pub kind: IconKind,
}

impl JobRequest {
    /// Resolves `settings` for `script`, validating everything up front.
    pub fn from_settings(script: &Path, settings: &BatchSettings) -> Result<Self, ValidationError> {
        // Resolves `..` and symlinks so one file always has one identity
        let script_path = std::fs::canonicalize(script)
            .map_err(|_| ValidationError::ScriptNotFound(script.to_path_buf()))?;
        if !script_path.is_file() {
            return Err(ValidationError::ScriptNotFound(script_path));
        }
        if !is_supported_script(&script_path) {
            return Err(ValidationError::UnsupportedScript(script_path));
        }

        let script_dir = parent_dir(&script_path);
        let output_dir = match settings.output_dir.as_deref() {
            Some(dir) if !dir.as_os_str().is_empty() => resolve_dir(dir),
            _ => script_dir,
        };

        let exe_name = match non_blank(settings.exe_name.as_deref()) {
            Some(name) => name.to_string(),
            None => script_stem(&script_path),
        };
        if exe_name.is_empty() || exe_name.contains(['/', '\\']) || exe_name == ".." {
            return Err(ValidationError::InvalidExeName(exe_name));
        }

        let icon = match settings.icon_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Some(resolve_icon(path)?),
            _ => None,
        };

        let file_version = settings
            .file_version
            .as_deref()
            .map(|v| v.trim().parse::<FileVersion>())
            .transpose()?;

        for data_file in &settings.data_files {
            if !data_file.exists() {
                return Err(ValidationError::DataFileNotFound(data_file.clone()));
            }
        }

        Ok(Self {
            script_path,
            mode: settings.mode,
            output_dir,
            exe_name,
            icon,
            file_version,
            copyright_info: non_blank(settings.copyright_info.as_deref()).map(str::to_string),
            extra_modules: parse_modules(&settings.extra_modules),
            extra_args: split_args(&settings.extra_args),
            data_files: settings.data_files.clone(),
        })
    }

    pub fn job_id(&self) -> JobId {
        JobId::from_script(&self.script_path)
    }

    /// Directory holding the script, where temporary files are written.
    pub fn script_dir(&self) -> PathBuf {
        parent_dir(&self.script_path)
    }

    /// Where the packaging tool is expected to put the executable.
    pub fn expected_exe_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", self.exe_name, std::env::consts::EXE_SUFFIX))
    }

    /// Sibling file a `.png` icon is converted into.
    pub fn converted_icon_path(&self) -> PathBuf {
        self.script_dir()
            .join(format!("{}_icon_converted.ico", script_stem(&self.script_path)))
    }

    /// Sibling file the version descriptor is written to.
    pub fn version_file_path(&self) -> PathBuf {
        self.script_dir()
            .join(format!("{}_version_info.txt", script_stem(&self.script_path)))
    }

    /// A version descriptor is generated only when there is something to put in it.
    pub fn wants_version_file(&self) -> bool {
        self.file_version.is_some() || self.copyright_info.is_some()
    }
}

fn resolve_icon(path: &Path) -> Result<IconSource, ValidationError> {
    let kind = IconKind::from_path(path)
        .map_err(|_| ValidationError::UnsupportedIcon(path.to_path_buf()))?;
    if !path.is_file() {
        return Err(ValidationError::IconNotFound(path.to_path_buf()));
    }
    Ok(IconSource {
        path: std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
        kind,
    })
}

/// Canonical form of a directory that may not exist yet.
///
/// A missing tail is folded lexically and appended to its deepest existing
/// ancestor.
fn resolve_dir(dir: &Path) -> PathBuf {
    let absolute = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }
    let folded = normalize_lexically(&absolute);
    for ancestor in folded.ancestors() {
        if let Ok(canonical) = std::fs::canonicalize(ancestor) {
            if let Ok(tail) = folded.strip_prefix(ancestor) {
                return canonical.join(tail);
            }
        }
    }
    folded
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn script_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
