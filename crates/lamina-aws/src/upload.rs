//! Artifact upload to object storage.
//!
//! A bucket-backed publish references an object that must already exist, so
//! the archive is uploaded first under its base name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use lamina_core::{LayerError, LayerResult};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, info};

use crate::client::AwsConfig;

/// Puts archives into object storage.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    /// Upload the file at `path` to `bucket` under `key`.
    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> LayerResult<()>;
}

/// S3 uploader with one client per bucket.
///
/// Credentials come from the standard `AWS_*` environment variables.
#[derive(Debug)]
pub struct S3Uploader {
    region: String,
    endpoint: Option<String>,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl S3Uploader {
    /// Create an uploader for `region`.
    #[must_use]
    pub fn new(region: impl Into<String>, config: &AwsConfig) -> Self {
        Self {
            region: region.into(),
            endpoint: config.endpoint.clone(),
            stores: RwLock::new(HashMap::new()),
        }
    }

    fn store_for(&self, bucket: &str) -> LayerResult<Arc<dyn ObjectStore>> {
        {
            let stores = self
                .stores
                .read()
                .map_err(|_| LayerError::internal("lock poisoned"))?;
            if let Some(store) = stores.get(bucket) {
                return Ok(Arc::clone(store));
            }
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(&self.region);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }
        let store: Arc<dyn ObjectStore> = Arc::new(
            builder
                .build()
                .map_err(|e| LayerError::Storage(format!("failed to create S3 client: {e}")))?,
        );

        let mut stores = self
            .stores
            .write()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        Ok(Arc::clone(
            stores.entry(bucket.to_owned()).or_insert(store),
        ))
    }
}

#[async_trait]
impl ArtifactUploader for S3Uploader {
    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> LayerResult<()> {
        let store = self.store_for(bucket)?;
        put_file(store.as_ref(), bucket, key, path).await
    }
}

/// Uploader backed by per-bucket in-memory stores.
#[derive(Debug, Default)]
pub struct MemoryUploader {
    buckets: RwLock<HashMap<String, Arc<InMemory>>>,
    uploads: AtomicUsize,
}

impl MemoryUploader {
    /// Create an uploader with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` directly.
    pub async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> LayerResult<()> {
        let store = self.bucket(bucket)?;
        store
            .put(&ObjectPath::from(key), Bytes::from(data).into())
            .await
            .map_err(|e| LayerError::Storage(format!("failed to store s3://{bucket}/{key}: {e}")))?;
        Ok(())
    }

    /// Read an object back, `None` if it does not exist.
    pub async fn get(&self, bucket: &str, key: &str) -> LayerResult<Option<Bytes>> {
        let store = {
            let buckets = self
                .buckets
                .read()
                .map_err(|_| LayerError::internal("lock poisoned"))?;
            match buckets.get(bucket) {
                Some(store) => Arc::clone(store),
                None => return Ok(None),
            }
        };

        match store.get(&ObjectPath::from(key)).await {
            Ok(result) => result
                .bytes()
                .await
                .map(Some)
                .map_err(|e| LayerError::Storage(format!("failed to read s3://{bucket}/{key}: {e}"))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(LayerError::Storage(format!(
                "failed to read s3://{bucket}/{key}: {e}"
            ))),
        }
    }

    /// Number of uploads performed through [`ArtifactUploader::upload`].
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn bucket(&self, bucket: &str) -> LayerResult<Arc<InMemory>> {
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        Ok(Arc::clone(
            buckets
                .entry(bucket.to_owned())
                .or_insert_with(|| Arc::new(InMemory::new())),
        ))
    }
}

#[async_trait]
impl ArtifactUploader for MemoryUploader {
    async fn upload(&self, bucket: &str, key: &str, path: &Path) -> LayerResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let store = self.bucket(bucket)?;
        put_file(store.as_ref(), bucket, key, path).await
    }
}

async fn put_file(store: &dyn ObjectStore, bucket: &str, key: &str, path: &Path) -> LayerResult<()> {
    let data = tokio::fs::read(path).await?;
    let size = data.len();
    let location = ObjectPath::from(key);

    debug!(bucket = %bucket, key = %location, size, "uploading artifact");
    store
        .put(&location, Bytes::from(data).into())
        .await
        .map_err(|e| LayerError::Storage(format!("failed to upload s3://{bucket}/{key}: {e}")))?;

    info!(bucket = %bucket, key = %location, size, "artifact uploaded");
    Ok(())
}
