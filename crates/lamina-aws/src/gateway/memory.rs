//! In-memory layer API.
//!
//! Behaves like the provider where reconciliation can tell the difference:
//! version numbers increase per layer name and are never reused, deleted
//! versions stay deleted, and `CodeSha256` is the digest of the published
//! bytes. Bucket-backed publishes read the object from a [`MemoryUploader`],
//! so publishing before uploading fails the same way it would remotely.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use lamina_core::{
    CodeDigest, LayerArn, LayerContent, LayerError, LayerResult, LayerVersionArn, PublishRequest,
    PublishedVersion, RemoteLayerDescriptor,
};

use super::LayerGateway;
use crate::upload::MemoryUploader;

#[derive(Debug, Clone)]
struct StoredVersion {
    description: String,
    content_hash: CodeDigest,
    runtimes: Vec<String>,
    statement_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct StoredLayer {
    latest: u64,
    versions: BTreeMap<u64, StoredVersion>,
}

/// Counts of calls made against a [`MemoryGateway`].
#[derive(Debug, Default)]
struct CallCounts {
    publish: AtomicUsize,
    fetch: AtomicUsize,
    delete: AtomicUsize,
    list: AtomicUsize,
}

/// In-memory [`LayerGateway`] for tests and local dry runs.
#[derive(Debug)]
pub struct MemoryGateway {
    region: String,
    account: String,
    layers: RwLock<HashMap<String, StoredLayer>>,
    objects: Option<Arc<MemoryUploader>>,
    failing_deletes: RwLock<HashSet<(String, u64)>>,
    failing_permissions: AtomicBool,
    calls: CallCounts,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new("us-east-1")
    }
}

impl MemoryGateway {
    /// Create an empty gateway for `region`.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account: "000000000000".to_owned(),
            layers: RwLock::new(HashMap::new()),
            objects: None,
            failing_deletes: RwLock::new(HashSet::new()),
            failing_permissions: AtomicBool::new(false),
            calls: CallCounts::default(),
        }
    }

    /// Resolve bucket-backed publishes against `uploader`.
    #[must_use]
    pub fn with_objects(mut self, uploader: Arc<MemoryUploader>) -> Self {
        self.objects = Some(uploader);
        self
    }

    /// Make deletes of `name:version` fail with a provider error.
    pub fn fail_deletes_of(&self, name: &str, version: u64) -> LayerResult<()> {
        let mut failing = self
            .failing_deletes
            .write()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        failing.insert((name.to_owned(), version));
        Ok(())
    }

    /// Make every permission grant fail with a provider error.
    pub fn fail_permissions(&self) {
        self.failing_permissions.store(true, Ordering::SeqCst);
    }

    /// Version ARN this gateway assigns to `name:version`.
    #[must_use]
    pub fn version_arn(&self, name: &str, version: u64) -> LayerVersionArn {
        self.layer_arn(name).version(version)
    }

    /// Statement ids granted on a version, if it exists.
    pub fn permissions(&self, arn: &LayerVersionArn) -> LayerResult<Option<Vec<String>>> {
        let layers = self
            .layers
            .read()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        Ok(layers
            .get(arn.name())
            .and_then(|l| l.versions.get(&arn.version()))
            .map(|v| v.statement_ids.clone()))
    }

    /// Number of publish calls made.
    #[must_use]
    pub fn publish_calls(&self) -> usize {
        self.calls.publish.load(Ordering::SeqCst)
    }

    /// Number of fetch calls made.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.calls.fetch.load(Ordering::SeqCst)
    }

    /// Number of delete calls made.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    /// Number of list calls made.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.calls.list.load(Ordering::SeqCst)
    }

    fn layer_arn(&self, name: &str) -> LayerArn {
        LayerArn::from_parts(&self.region, &self.account, name)
    }

    async fn content_digest(&self, content: &LayerContent) -> LayerResult<CodeDigest> {
        match content {
            LayerContent::Inline(bytes) => Ok(CodeDigest::of(bytes)),
            LayerContent::S3 { bucket, key } => {
                let objects = self.objects.as_ref().ok_or_else(|| {
                    LayerError::provider("PublishLayerVersion", "no object storage attached")
                })?;
                let data = objects.get(bucket, key).await?.ok_or_else(|| {
                    LayerError::provider(
                        "PublishLayerVersion",
                        format!("InvalidParameterValueException: s3://{bucket}/{key} does not exist"),
                    )
                })?;
                Ok(CodeDigest::of(&data))
            }
        }
    }
}

#[async_trait]
impl LayerGateway for MemoryGateway {
    async fn publish(&self, request: PublishRequest) -> LayerResult<PublishedVersion> {
        self.calls.publish.fetch_add(1, Ordering::SeqCst);
        let content_hash = self.content_digest(&request.content).await?;

        let mut layers = self
            .layers
            .write()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        let layer = layers.entry(request.name.clone()).or_default();
        layer.latest += 1;
        let version = layer.latest;
        layer.versions.insert(
            version,
            StoredVersion {
                description: request.description,
                content_hash,
                runtimes: request.runtimes,
                statement_ids: Vec::new(),
            },
        );

        let layer_arn = self.layer_arn(&request.name);
        Ok(PublishedVersion {
            version_arn: layer_arn.version(version),
            layer_arn,
            version,
        })
    }

    async fn fetch(&self, arn: &LayerVersionArn) -> LayerResult<Option<RemoteLayerDescriptor>> {
        self.calls.fetch.fetch_add(1, Ordering::SeqCst);
        let layers = self
            .layers
            .read()
            .map_err(|_| LayerError::internal("lock poisoned"))?;

        let Some(stored) = layers
            .get(arn.name())
            .and_then(|l| l.versions.get(&arn.version()))
        else {
            return Ok(None);
        };

        Ok(Some(RemoteLayerDescriptor {
            name: arn.name().to_owned(),
            description: stored.description.clone(),
            content_hash: stored.content_hash,
            runtimes: stored.runtimes.clone(),
            version_arn: self.version_arn(arn.name(), arn.version()),
            bucket: None,
        }))
    }

    async fn delete_version(&self, arn: &LayerVersionArn) -> LayerResult<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent deletes genuinely interleave.
        tokio::task::yield_now().await;

        let failing = self
            .failing_deletes
            .read()
            .map_err(|_| LayerError::internal("lock poisoned"))?
            .contains(&(arn.name().to_owned(), arn.version()));
        if failing {
            return Err(LayerError::provider(
                "DeleteLayerVersion",
                format!("AccessDeniedException: not allowed to delete {arn}"),
            ));
        }

        let mut layers = self
            .layers
            .write()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        if let Some(layer) = layers.get_mut(arn.name()) {
            layer.versions.remove(&arn.version());
        }
        Ok(())
    }

    async fn list_versions(&self, name: &str) -> LayerResult<Vec<u64>> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        let layers = self
            .layers
            .read()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        Ok(layers
            .get(name)
            .map(|l| l.versions.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn add_permission(&self, arn: &LayerVersionArn, statement_id: &str) -> LayerResult<()> {
        if self.failing_permissions.load(Ordering::SeqCst) {
            return Err(LayerError::provider(
                "AddLayerVersionPermission",
                format!("AccessDeniedException: not allowed to share {arn}"),
            ));
        }

        let mut layers = self
            .layers
            .write()
            .map_err(|_| LayerError::internal("lock poisoned"))?;
        let version = layers
            .get_mut(arn.name())
            .and_then(|l| l.versions.get_mut(&arn.version()))
            .ok_or_else(|| {
                LayerError::provider(
                    "AddLayerVersionPermission",
                    format!("ResourceNotFoundException: {arn}"),
                )
            })?;

        if version.statement_ids.iter().any(|s| s == statement_id) {
            return Err(LayerError::provider(
                "AddLayerVersionPermission",
                format!("ResourceConflictException: statement {statement_id} exists"),
            ));
        }
        version.statement_ids.push(statement_id.to_owned());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn inline(name: &str, description: &str, bytes: &[u8]) -> PublishRequest {
        PublishRequest {
            name: name.to_owned(),
            description: description.to_owned(),
            runtimes: vec!["python3.12".to_owned()],
            content: LayerContent::Inline(bytes.to_vec()),
        }
    }

    #[tokio::test]
    async fn publish_then_fetch_round_trips_metadata() {
        let gateway = MemoryGateway::default();
        let published = gateway.publish(inline("deps", "d1", b"zip")).await.unwrap();

        assert_eq!(published.version, 1);
        assert_eq!(published.version_arn.name(), "deps");
        assert_eq!(published.layer_arn, published.version_arn.layer_arn());

        let fetched = gateway
            .fetch(&published.version_arn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.description, "d1");
        assert_eq!(fetched.runtimes, vec!["python3.12"]);
        assert_eq!(fetched.content_hash, CodeDigest::of(b"zip"));
        assert_eq!(fetched.version_arn, published.version_arn);
    }

    #[tokio::test]
    async fn content_hash_tracks_bytes() {
        let gateway = MemoryGateway::default();
        let v1 = gateway.publish(inline("deps", "d", b"a")).await.unwrap();
        let v2 = gateway.publish(inline("deps", "d", b"a")).await.unwrap();
        let v3 = gateway.publish(inline("deps", "d", b"b")).await.unwrap();

        let hash = |d: Option<RemoteLayerDescriptor>| d.unwrap().content_hash;
        let h1 = hash(gateway.fetch(&v1.version_arn).await.unwrap());
        let h2 = hash(gateway.fetch(&v2.version_arn).await.unwrap());
        let h3 = hash(gateway.fetch(&v3.version_arn).await.unwrap());
        assert_eq!(h1, h2);
        assert_ne!(h2, h3);
    }

    #[tokio::test]
    async fn versions_are_never_reused() {
        let gateway = MemoryGateway::default();
        let v1 = gateway.publish(inline("deps", "d", b"a")).await.unwrap();
        gateway.delete_version(&v1.version_arn).await.unwrap();
        let v2 = gateway.publish(inline("deps", "d", b"a")).await.unwrap();

        assert_eq!(v2.version, 2);
        assert_eq!(gateway.list_versions("deps").await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn missing_versions_are_absent_and_deletable() {
        let gateway = MemoryGateway::default();
        let arn = gateway.version_arn("ghost", 4);

        assert!(gateway.fetch(&arn).await.unwrap().is_none());
        gateway.delete_version(&arn).await.unwrap();
        assert!(gateway.list_versions("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bucket_publish_requires_uploaded_object() {
        let uploader = Arc::new(MemoryUploader::new());
        let gateway = MemoryGateway::default().with_objects(Arc::clone(&uploader));
        let request = PublishRequest {
            content: LayerContent::S3 {
                bucket: "artifacts".to_owned(),
                key: "abc123.zip".to_owned(),
            },
            ..inline("deps", "d", b"")
        };

        let err = gateway.publish(request.clone()).await.unwrap_err();
        assert!(matches!(err, LayerError::Provider { .. }));

        uploader
            .put("artifacts", "abc123.zip", b"archive".to_vec())
            .await
            .unwrap();
        let published = gateway.publish(request).await.unwrap();
        let fetched = gateway.fetch(&published.version_arn).await.unwrap().unwrap();
        assert_eq!(fetched.content_hash, CodeDigest::of(b"archive"));
    }

    #[tokio::test]
    async fn permissions_are_recorded_per_version() {
        let gateway = MemoryGateway::default();
        let v1 = gateway.publish(inline("deps", "d", b"a")).await.unwrap();

        gateway.add_permission(&v1.version_arn, "s1").await.unwrap();
        assert_eq!(
            gateway.permissions(&v1.version_arn).unwrap(),
            Some(vec!["s1".to_owned()])
        );
        assert!(gateway.add_permission(&v1.version_arn, "s1").await.is_err());
    }

    #[tokio::test]
    async fn injected_delete_failures_surface_as_provider_errors() {
        let gateway = MemoryGateway::default();
        let v1 = gateway.publish(inline("deps", "d", b"a")).await.unwrap();
        gateway.fail_deletes_of("deps", 1).unwrap();

        let err = gateway.delete_version(&v1.version_arn).await.unwrap_err();
        assert!(err.to_string().contains("AccessDenied"));
        assert_eq!(gateway.list_versions("deps").await.unwrap(), vec![1]);
    }
}
