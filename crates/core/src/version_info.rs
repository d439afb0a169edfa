//! Version-resource descriptor for the produced executable.
//!
//! The packaging tool reads a textual `VSVersionInfo(...)` descriptor via
//! `--version-file`. [`VersionInfo::render`] produces that text; the job
//! writes it next to the script and removes it again once the job ends.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A malformed version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{input}': expected four dot-separated numbers such as 1.0.0.0")]
pub struct ParseVersionError {
    pub input: String,
}

/// A four-part numeric version, `W.X.Y.Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileVersion(pub [u16; 4]);

impl Default for FileVersion {
    fn default() -> Self {
        Self([1, 0, 0, 0])
    }
}

impl FromStr for FileVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError {
            input: s.to_string(),
        };

        let mut parts = [0u16; 4];
        let mut count = 0;
        for part in s.split('.') {
            if count == 4 || part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(err());
            }
            parts[count] = part.parse().map_err(|_| err())?;
            count += 1;
        }

        if count != 4 {
            return Err(err());
        }
        Ok(Self(parts))
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [w, x, y, z] = self.0;
        write!(f, "{w}.{x}.{y}.{z}")
    }
}

impl Serialize for FileVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FileVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Inputs of the version descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: FileVersion,
    pub exe_name: String,
    pub copyright: String,
}

impl VersionInfo {
    pub fn new(
        version: Option<FileVersion>,
        exe_name: impl Into<String>,
        copyright: Option<&str>,
    ) -> Self {
        Self {
            version: version.unwrap_or_default(),
            exe_name: exe_name.into(),
            copyright: copyright.unwrap_or_default().to_string(),
        }
    }

    /// Renders the descriptor text.
    pub fn render(&self) -> String {
        let [w, x, y, z] = self.version.0;
        let tuple = format!("({w}, {x}, {y}, {z})");
        let version = self.version.to_string();
        let original_name = format!("{}.exe", self.exe_name);

        let strings = [
            ("CompanyName", ""),
            ("FileDescription", self.exe_name.as_str()),
            ("FileVersion", version.as_str()),
            ("InternalName", original_name.as_str()),
            ("LegalCopyright", self.copyright.as_str()),
            ("OriginalFilename", original_name.as_str()),
            ("ProductName", self.exe_name.as_str()),
            ("ProductVersion", version.as_str()),
        ]
        .iter()
        .map(|(key, value)| format!("StringStruct('{}', '{}')", key, escape(value)))
        .collect::<Vec<_>>()
        .join(",\n        ");

        format!(
            "# UTF-8
VSVersionInfo(
  ffi=FixedFileInfo(
    filevers={tuple},
    prodvers={tuple},
    mask=0x3f,
    flags=0x0,
    OS=0x40004,
    fileType=0x1,
    subtype=0x0,
    date=(0, 0)
    ),
  kids=[
    StringFileInfo(
      [
      StringTable(
        '040904B0',
        [{strings}])
      ]),
    VarFileInfo([VarStruct('Translation', [1033, 1200])])
  ]
)
"
        )
    }
}

/// Escapes a value for a single-quoted descriptor literal.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
