//! Shared fixtures for engine integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lamina_aws::{ArtifactUploader, LayerGateway, MemoryGateway, MemoryUploader};
use lamina_control::{LayerEngine, MemoryStateStore, StateStore};
use lamina_core::{IdSource, LayerSpec, SequentialIds, StateRecord};
use lamina_package::{ArchivePackager, PackagerConfig};
use tempfile::TempDir;

/// An engine wired to in-memory doubles and a real packager in a temp dir.
pub struct Harness {
    pub dir: TempDir,
    pub code: PathBuf,
    pub gateway: Arc<MemoryGateway>,
    pub uploader: Arc<MemoryUploader>,
    pub store: Arc<dyn StateStore>,
    pub engine: LayerEngine,
}

impl Harness {
    /// Harness with an in-memory state store.
    pub fn new() -> Self {
        Self::with_store(|_| Arc::new(MemoryStateStore::new()))
    }

    /// Harness with a state store built from the temp dir.
    pub fn with_store(store: impl FnOnce(&Path) -> Arc<dyn StateStore>) -> Self {
        let dir = TempDir::new().unwrap();
        let code = dir.path().join("layer");
        std::fs::create_dir_all(&code).unwrap();
        std::fs::write(code.join("index.js"), "module.exports = {};\n").unwrap();

        let ids: Arc<dyn IdSource> = Arc::new(SequentialIds::new("id"));
        let packager = ArchivePackager::new(&PackagerConfig {
            cache_dir: dir.path().join("cache"),
            ..PackagerConfig::default()
        })
        .unwrap()
        .with_ids(Arc::clone(&ids));

        let uploader = Arc::new(MemoryUploader::new());
        let gateway = Arc::new(MemoryGateway::default().with_objects(Arc::clone(&uploader)));
        let store = store(dir.path());

        let engine = LayerEngine::new(
            Arc::clone(&gateway) as Arc<dyn LayerGateway>,
            Arc::clone(&uploader) as Arc<dyn ArtifactUploader>,
            Arc::new(packager),
            Arc::clone(&store),
            ids,
        );

        Self {
            dir,
            code,
            gateway,
            uploader,
            store,
            engine,
        }
    }

    /// Spec for `name` pointing at the harness code directory.
    pub fn spec(&self, name: &str) -> LayerSpec {
        LayerSpec::new(name, &self.code).with_runtimes(["nodejs14.x"])
    }

    /// Write a file under the code directory.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.code.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    /// Write the manifest the packager keys its cache on.
    pub fn write_manifest(&self, contents: &str) {
        std::fs::write(self.dir.path().join("package.json"), contents).unwrap();
    }

    /// Current state record.
    pub async fn state(&self) -> StateRecord {
        self.store.load().await.unwrap()
    }
}
