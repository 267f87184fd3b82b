//! Change detection.
//!
//! A layer version is immutable, so any difference in what would be published
//! means a new version. Four fields determine the published bytes and
//! metadata: description, content hash, runtimes and bucket. Identifiers and
//! orchestration details (name, region, ARNs) never trigger a republish on
//! their own.

use crate::digest::CodeDigest;
use crate::types::{LayerSpec, PackagedArtifact, RemoteLayerDescriptor};

/// The comparable slice of the desired configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesiredLayer<'a> {
    /// Desired description.
    pub description: &'a str,
    /// Digest of the freshly packaged archive.
    pub content_hash: CodeDigest,
    /// Desired runtimes, order significant.
    pub runtimes: &'a [String],
    /// Desired upload bucket.
    pub bucket: Option<&'a str>,
}

impl<'a> DesiredLayer<'a> {
    /// Build from a spec and the artifact packaged for it.
    #[must_use]
    pub fn new(spec: &'a LayerSpec, artifact: &PackagedArtifact) -> Self {
        Self {
            description: &spec.description,
            content_hash: artifact.content_hash,
            runtimes: &spec.runtimes,
            bucket: spec.bucket.as_deref(),
        }
    }
}

/// Whether publishing `desired` would differ from `previous`.
///
/// `previous` must already carry the recorded bucket; an absent previous
/// version is always a change.
#[must_use]
pub fn changed(previous: Option<&RemoteLayerDescriptor>, desired: &DesiredLayer<'_>) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    previous.description != desired.description
        || previous.content_hash != desired.content_hash
        || previous.runtimes.as_slice() != desired.runtimes
        || previous.bucket.as_deref() != desired.bucket
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arn::LayerVersionArn;

    fn descriptor() -> RemoteLayerDescriptor {
        RemoteLayerDescriptor {
            name: "deps".to_owned(),
            description: "d1".to_owned(),
            content_hash: CodeDigest::of(b"archive"),
            runtimes: vec!["nodejs14.x".to_owned()],
            version_arn: LayerVersionArn::parse("arn:aws:lambda:us-east-1:1:layer:deps:1")
                .unwrap(),
            bucket: None,
        }
    }

    fn desired_from(d: &RemoteLayerDescriptor) -> DesiredLayer<'_> {
        DesiredLayer {
            description: &d.description,
            content_hash: d.content_hash,
            runtimes: &d.runtimes,
            bucket: d.bucket.as_deref(),
        }
    }

    #[test]
    fn absent_previous_is_a_change() {
        let d = descriptor();
        assert!(changed(None, &desired_from(&d)));
    }

    #[test]
    fn identical_fields_are_unchanged() {
        let d = descriptor();
        assert!(!changed(Some(&d), &desired_from(&d)));
    }

    #[test]
    fn fields_outside_the_compared_set_are_ignored() {
        let d = descriptor();
        let mut other = d.clone();
        other.name = "renamed".to_owned();
        other.version_arn =
            LayerVersionArn::parse("arn:aws:lambda:eu-west-1:2:layer:renamed:9").unwrap();

        assert!(!changed(Some(&other), &desired_from(&d)));
    }

    #[test]
    fn each_compared_field_triggers_a_change() {
        let d = descriptor();
        let runtimes = vec!["nodejs14.x".to_owned(), "nodejs16.x".to_owned()];
        let reordered = vec!["nodejs16.x".to_owned(), "nodejs14.x".to_owned()];

        let variants = [
            DesiredLayer {
                description: "d2",
                ..desired_from(&d)
            },
            DesiredLayer {
                content_hash: CodeDigest::of(b"other archive"),
                ..desired_from(&d)
            },
            DesiredLayer {
                runtimes: &runtimes,
                ..desired_from(&d)
            },
            DesiredLayer {
                runtimes: &[],
                ..desired_from(&d)
            },
            DesiredLayer {
                bucket: Some("artifacts"),
                ..desired_from(&d)
            },
        ];
        for desired in &variants {
            assert!(changed(Some(&d), desired), "{desired:?} should be a change");
        }

        let mut two = d.clone();
        two.runtimes = runtimes.clone();
        let desired = DesiredLayer {
            runtimes: &reordered,
            ..desired_from(&two)
        };
        assert!(changed(Some(&two), &desired));
    }

    #[test]
    fn dropping_a_recorded_bucket_is_a_change() {
        let recorded = descriptor().with_recorded_bucket(Some("artifacts".to_owned()));
        let desired = DesiredLayer {
            bucket: None,
            ..desired_from(&recorded)
        };
        assert!(changed(Some(&recorded), &desired));
    }
}
