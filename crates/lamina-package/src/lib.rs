//! Layer archive packaging.
//!
//! Packs a source directory into a zip (or tar) archive whose bytes depend
//! only on file paths and contents: entries are sorted and every timestamp is
//! pinned. The resulting digest is what change detection compares against
//! the provider's `CodeSha256`.

#![forbid(unsafe_code)]

mod archive;
mod config;
mod packager;

pub use archive::{collect_entries, write_archive, ArchiveEntry};
pub use config::{ArchiveFormat, PackagerConfig};
pub use packager::{is_archive_path, ArchivePackager};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lamina_core::{LayerResult, PackagedArtifact};

/// Turns layer source code into an archive.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Package `code` with an optional destination `prefix`, adding each
    /// `include` file at the archive root.
    ///
    /// A `code` path that already names an archive is returned unchanged.
    async fn pack(
        &self,
        code: &Path,
        prefix: Option<&str>,
        include: &[PathBuf],
    ) -> LayerResult<PackagedArtifact>;
}
