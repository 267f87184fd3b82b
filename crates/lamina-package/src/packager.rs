//! Filesystem packager with a manifest-keyed archive cache.
//!
//! The output location is derived from the manifest that sits next to the
//! source directory (`<code>/../package.json` by default): the first six hex
//! characters of its SHA-256 name the archive. An archive already present at
//! that location is reused as is. Without a manifest the key is random, so
//! nothing is ever reused.
//!
//! The cache is keyed by manifest, not by content. Two trees sharing one
//! manifest, or two manifests whose truncated digests collide, map to the
//! same archive.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lamina_core::{CodeDigest, IdSource, LayerError, LayerResult, PackagedArtifact, UlidIds};
use sha2::{Digest, Sha256};
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use crate::archive::{collect_entries, write_archive};
use crate::config::{ArchiveFormat, PackagerConfig};
use crate::Packager;

const CACHE_KEY_LEN: usize = 6;

/// Whether `path` names a pre-built archive that needs no packaging.
#[must_use]
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.parse::<ArchiveFormat>().is_ok())
}

/// Packages directories into deterministic archives on the local filesystem.
#[derive(Clone)]
pub struct ArchivePackager {
    cache_dir: PathBuf,
    manifest: String,
    format: ArchiveFormat,
    ids: Arc<dyn IdSource>,
}

impl ArchivePackager {
    /// Create a packager from configuration.
    ///
    /// Fails if the configured archive format is not supported.
    pub fn new(config: &PackagerConfig) -> LayerResult<Self> {
        Ok(Self {
            cache_dir: config.cache_dir.clone(),
            manifest: config.manifest.clone(),
            format: config.format.parse()?,
            ids: Arc::new(UlidIds),
        })
    }

    /// Replace the id source used for manifest-less cache keys.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Archive location for `code`.
    pub fn output_path(&self, code: &Path) -> LayerResult<PathBuf> {
        let manifest = manifest_path(code, &self.manifest);
        let key = if manifest.is_file() {
            let data = std::fs::read(&manifest)?;
            let digest = hex::encode(Sha256::digest(&data));
            debug!(manifest = %manifest.display(), key = &digest[..CACHE_KEY_LEN], "derived cache key");
            digest[..CACHE_KEY_LEN].to_owned()
        } else {
            self.ids.next_id()
        };

        Ok(self
            .cache_dir
            .join(format!("{key}.{}", self.format.extension())))
    }

    fn pack_sync(
        &self,
        code: &Path,
        prefix: Option<&str>,
        include: &[PathBuf],
    ) -> LayerResult<PackagedArtifact> {
        if is_archive_path(code) {
            let path = std::path::absolute(code)?;
            debug!(path = %path.display(), "using pre-built archive");
            return artifact_at(path);
        }

        let metadata = std::fs::metadata(code).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to read {}: {e}", code.display()))
        })?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "code path is neither a directory nor an archive: {}",
                    code.display()
                ),
            )
            .into());
        }

        let output = self.output_path(code)?;
        if output.exists() {
            debug!(path = %output.display(), "reusing cached archive");
            return artifact_at(output);
        }

        let entries = collect_entries(code, prefix, include)?;
        write_archive(self.format, &entries, &output)?;

        let artifact = artifact_at(output)?;
        info!(
            path = %artifact.path.display(),
            entries = entries.len(),
            hash = %artifact.content_hash,
            "packaged layer"
        );
        Ok(artifact)
    }
}

#[async_trait]
impl Packager for ArchivePackager {
    async fn pack(
        &self,
        code: &Path,
        prefix: Option<&str>,
        include: &[PathBuf],
    ) -> LayerResult<PackagedArtifact> {
        let this = self.clone();
        let code = code.to_owned();
        let prefix = prefix.map(ToOwned::to_owned);
        let include = include.to_vec();

        spawn_blocking(move || this.pack_sync(&code, prefix.as_deref(), &include))
            .await
            .map_err(|e| LayerError::internal(format!("packaging task failed: {e}")))?
    }
}

impl std::fmt::Debug for ArchivePackager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchivePackager")
            .field("cache_dir", &self.cache_dir)
            .field("manifest", &self.manifest)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

fn manifest_path(code: &Path, manifest: &str) -> PathBuf {
    code.join("..").join(manifest)
}

fn artifact_at(path: PathBuf) -> LayerResult<PackagedArtifact> {
    let content_hash = CodeDigest::of_reader(File::open(&path)?)?;
    Ok(PackagedArtifact { path, content_hash })
}
