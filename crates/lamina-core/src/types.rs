//! Core data model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::arn::{LayerArn, LayerVersionArn};
use crate::digest::CodeDigest;

/// Description applied when the configuration omits one.
pub const DEFAULT_DESCRIPTION: &str = "Serverless Layer";

/// Region used when the configuration omits one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// User-declared intent for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Layer name. Generated when absent and nothing is recorded yet.
    #[serde(default)]
    pub name: Option<String>,

    /// Layer description.
    #[serde(default = "default_description")]
    pub description: String,

    /// Source directory or pre-built archive.
    #[serde(default = "default_code")]
    pub code: PathBuf,

    /// Compatible runtimes, in declaration order.
    #[serde(default)]
    pub runtimes: Vec<String>,

    /// Path prefix applied to every packaged file (e.g. `nodejs`).
    #[serde(default)]
    pub prefix: Option<String>,

    /// Extra files placed at the archive root under their base names.
    #[serde(default)]
    pub include: Vec<PathBuf>,

    /// Bucket to upload the archive to before publishing.
    #[serde(default)]
    pub bucket: Option<String>,

    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Grant `lambda:GetLayerVersion` to every account on each new version.
    #[serde(default)]
    pub public: bool,
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_owned()
}

fn default_code() -> PathBuf {
    PathBuf::from(".")
}

fn default_region() -> String {
    DEFAULT_REGION.to_owned()
}

impl Default for LayerSpec {
    fn default() -> Self {
        Self {
            name: None,
            description: default_description(),
            code: default_code(),
            runtimes: Vec::new(),
            prefix: None,
            include: Vec::new(),
            bucket: None,
            region: default_region(),
            public: false,
        }
    }
}

impl LayerSpec {
    /// Create a spec for the given name and source path with defaults elsewhere.
    #[must_use]
    pub fn new(name: impl Into<String>, code: impl Into<PathBuf>) -> Self {
        Self {
            name: Some(name.into()),
            code: code.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the compatible runtimes.
    #[must_use]
    pub fn with_runtimes<I, S>(mut self, runtimes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtimes = runtimes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the upload bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set the archive path prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Add an extra file to the archive root.
    #[must_use]
    pub fn with_include(mut self, path: impl Into<PathBuf>) -> Self {
        self.include.push(path.into());
        self
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

/// A packaged archive ready for upload or inline publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArtifact {
    /// Local archive location.
    pub path: PathBuf,
    /// SHA-256 of the archive bytes.
    pub content_hash: CodeDigest,
}

impl PackagedArtifact {
    /// Object key used when the archive is uploaded to a bucket.
    #[must_use]
    pub fn object_key(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The provider's view of one layer version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayerDescriptor {
    /// Layer name.
    pub name: String,
    /// Version description.
    pub description: String,
    /// Provider-computed digest of the uploaded bytes.
    pub content_hash: CodeDigest,
    /// Compatible runtimes.
    pub runtimes: Vec<String>,
    /// Version ARN.
    pub version_arn: LayerVersionArn,
    /// Bucket last used to publish. The provider never reports this, so it is
    /// seeded from the state record.
    pub bucket: Option<String>,
}

impl RemoteLayerDescriptor {
    /// Replace the bucket with the last recorded one.
    #[must_use]
    pub fn with_recorded_bucket(mut self, bucket: Option<String>) -> Self {
        self.bucket = bucket;
        self
    }
}

/// Where the publish call finds the archive.
#[derive(Clone, PartialEq, Eq)]
pub enum LayerContent {
    /// Already uploaded object.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },
    /// Archive bytes embedded in the request.
    Inline(Vec<u8>),
}

impl std::fmt::Debug for LayerContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::S3 { bucket, key } => write!(f, "S3(s3://{bucket}/{key})"),
            Self::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
        }
    }
}

/// Parameters for publishing a new layer version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Layer name.
    pub name: String,
    /// Version description.
    pub description: String,
    /// Compatible runtimes.
    pub runtimes: Vec<String>,
    /// Archive location.
    pub content: LayerContent,
}

/// Identifiers returned by a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVersion {
    /// Version-independent layer ARN.
    pub layer_arn: LayerArn,
    /// ARN of the new version.
    pub version_arn: LayerVersionArn,
    /// New version number.
    pub version: u64,
}

/// What was last deployed, persisted between invocations.
///
/// Empty (`{}` on disk) if and only if no layer version is owned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// Layer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version-independent layer ARN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<LayerArn>,
    /// ARN of the owned version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_arn: Option<LayerVersionArn>,
    /// Owned version number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Region the version was published to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Bucket the archive was uploaded to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

impl StateRecord {
    /// Record for a freshly published version.
    #[must_use]
    pub fn published(
        name: impl Into<String>,
        published: &PublishedVersion,
        region: impl Into<String>,
        bucket: Option<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            arn: Some(published.layer_arn.clone()),
            version_arn: Some(published.version_arn.clone()),
            version: Some(published.version),
            region: Some(region.into()),
            bucket,
        }
    }

    /// Whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether a layer version is owned.
    #[must_use]
    pub const fn owns_layer(&self) -> bool {
        self.name.is_some() && self.arn.is_some()
    }
}

/// Values returned to the host after a deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutput {
    /// Layer name.
    pub name: String,
    /// Region.
    pub region: String,
    /// Current version number.
    pub version: Option<u64>,
    /// Version-independent layer ARN.
    pub arn: Option<LayerArn>,
    /// ARN of the current version.
    pub arn_version: Option<LayerVersionArn>,
}

impl From<&StateRecord> for DeployOutput {
    fn from(state: &StateRecord) -> Self {
        Self {
            name: state.name.clone().unwrap_or_default(),
            region: state.region.clone().unwrap_or_default(),
            version: state.version,
            arn: state.arn.clone(),
            arn_version: state.version_arn.clone(),
        }
    }
}

/// Values returned to the host after a removal (always empty).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOutput {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn spec_defaults() {
        let spec: LayerSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, LayerSpec::default());
        assert_eq!(spec.description, "Serverless Layer");
        assert_eq!(spec.region, "us-east-1");
        assert!(spec.runtimes.is_empty());
        assert!(!spec.public);
    }

    #[test]
    fn empty_state_serialises_as_empty_object() {
        let state = StateRecord::default();
        assert!(state.is_empty());
        assert!(!state.owns_layer());
        assert_eq!(serde_json::to_string(&state).unwrap(), "{}");
    }

    #[test]
    fn state_uses_camel_case_keys() {
        let layer = LayerArn::parse("arn:aws:lambda:us-east-1:1:layer:deps").unwrap();
        let published = PublishedVersion {
            version_arn: layer.version(2),
            layer_arn: layer,
            version: 2,
        };
        let state = StateRecord::published("deps", &published, "us-east-1", None);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["versionArn"], "arn:aws:lambda:us-east-1:1:layer:deps:2");
        assert_eq!(json["version"], 2);
        assert!(json.get("bucket").is_none());

        let back: StateRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
        assert!(back.owns_layer());
    }

    #[test]
    fn object_key_is_archive_base_name() {
        let artifact = PackagedArtifact {
            path: PathBuf::from("/tmp/abc123.zip"),
            content_hash: CodeDigest::of(b""),
        };
        assert_eq!(artifact.object_key(), "abc123.zip");
    }

    #[test]
    fn inline_content_debug_hides_bytes() {
        let content = LayerContent::Inline(vec![0; 42]);
        assert_eq!(format!("{content:?}"), "Inline(42 bytes)");
    }
}
