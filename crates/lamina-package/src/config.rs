//! Packager configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use lamina_core::LayerError;
use serde::Deserialize;

/// Archive container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    /// Deflate-compressed zip, the only format Lambda accepts directly.
    #[default]
    Zip,
    /// Uncompressed POSIX tar.
    Tar,
}

impl ArchiveFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zip" => Ok(Self::Zip),
            "tar" => Ok(Self::Tar),
            other => Err(LayerError::config(format!(
                "unsupported archive format \"{other}\", expected \"zip\" or \"tar\""
            ))),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Configuration for [`ArchivePackager`](crate::ArchivePackager).
#[derive(Debug, Clone, Deserialize)]
pub struct PackagerConfig {
    /// Directory archives are written to and reused from.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Manifest file, looked up next to the source directory, whose digest
    /// keys the archive cache.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Archive format, `zip` or `tar`.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_manifest() -> String {
    "package.json".to_owned()
}

fn default_format() -> String {
    ArchiveFormat::Zip.extension().to_owned()
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            manifest: default_manifest(),
            format: default_format(),
        }
    }
}
