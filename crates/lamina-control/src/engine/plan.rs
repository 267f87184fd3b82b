//! Pure reconciliation decisions.
//!
//! Everything here is a function of the recorded state, the desired spec and
//! what the provider reported. Execution lives in [`LayerEngine`](super::LayerEngine).

use std::fmt;

use lamina_core::{changed, DesiredLayer, IdSource, LayerSpec, RemoteLayerDescriptor, StateRecord};
use serde::Serialize;

/// Where a layer sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerPhase {
    /// Nothing owned.
    Absent,
    /// A version is owned and recorded.
    Published,
    /// The previously owned version was deleted because the name changed.
    Replaced,
    /// Every version was deleted and the state cleared.
    Removed,
}

impl LayerPhase {
    /// Phase implied by a state record.
    #[must_use]
    pub const fn of(state: &StateRecord) -> Self {
        if state.owns_layer() {
            Self::Published
        } else {
            Self::Absent
        }
    }

    /// Get the phase name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Published => "published",
            Self::Replaced => "replaced",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for LayerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a deploy did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Nothing publishable changed; no remote writes.
    Unchanged,
    /// A new version was published under the recorded name.
    Published,
    /// The previous version was deleted and a new one published under a new
    /// name.
    Replaced,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unchanged => "unchanged",
            Self::Published => "published",
            Self::Replaced => "replaced",
        })
    }
}

/// Decision for the publish step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPlan {
    /// Keep the current version.
    Skip,
    /// Publish a new version, uploading the archive first if `upload`.
    Publish {
        /// Whether the archive must be put into the bucket first.
        upload: bool,
    },
}

/// Layer name to deploy under.
///
/// The declared name wins, then the recorded one; otherwise a new
/// `lamina-<id>` name is generated.
#[must_use]
pub fn resolve_name(spec: &LayerSpec, state: &StateRecord, ids: &dyn IdSource) -> String {
    spec.name
        .clone()
        .or_else(|| state.name.clone())
        .unwrap_or_else(|| format!("lamina-{}", ids.next_id()))
}

/// Whether the recorded version belongs to a different name and must be
/// deleted before publishing.
#[must_use]
pub fn needs_replacement(state: &StateRecord, name: &str) -> bool {
    state.name.as_deref().is_some_and(|recorded| recorded != name)
}

/// Decide whether to publish and whether to upload first.
///
/// `previous` must carry the recorded bucket. The archive is uploaded when a
/// bucket is configured and the bucket cannot already hold these bytes: there
/// is no previous version, its content differs, or it was published from a
/// different bucket.
#[must_use]
pub fn plan_publish(
    previous: Option<&RemoteLayerDescriptor>,
    desired: &DesiredLayer<'_>,
) -> PublishPlan {
    if !changed(previous, desired) {
        return PublishPlan::Skip;
    }

    let upload = desired.bucket.is_some()
        && previous.map_or(true, |p| {
            p.content_hash != desired.content_hash || p.bucket.as_deref() != desired.bucket
        });
    PublishPlan::Publish { upload }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lamina_core::{CodeDigest, LayerArn, SequentialIds};

    fn remote(description: &str, bytes: &[u8], bucket: Option<&str>) -> RemoteLayerDescriptor {
        RemoteLayerDescriptor {
            name: "deps".to_owned(),
            description: description.to_owned(),
            content_hash: CodeDigest::of(bytes),
            runtimes: vec!["nodejs20.x".to_owned()],
            version_arn: LayerArn::parse("arn:aws:lambda:us-east-1:1:layer:deps")
                .unwrap()
                .version(1),
            bucket: bucket.map(ToOwned::to_owned),
        }
    }

    fn desired<'a>(
        description: &'a str,
        bytes: &[u8],
        runtimes: &'a [String],
        bucket: Option<&'a str>,
    ) -> DesiredLayer<'a> {
        DesiredLayer {
            description,
            content_hash: CodeDigest::of(bytes),
            runtimes,
            bucket,
        }
    }

    #[test]
    fn name_resolution_order() {
        let ids = SequentialIds::new("n");
        let recorded = StateRecord {
            name: Some("recorded".to_owned()),
            ..StateRecord::default()
        };

        let named = LayerSpec::new("declared", ".");
        assert_eq!(resolve_name(&named, &recorded, &ids), "declared");

        let unnamed = LayerSpec::default();
        assert_eq!(resolve_name(&unnamed, &recorded, &ids), "recorded");
        assert_eq!(
            resolve_name(&unnamed, &StateRecord::default(), &ids),
            "lamina-n1"
        );
    }

    #[test]
    fn replacement_only_on_recorded_rename() {
        let recorded = StateRecord {
            name: Some("old".to_owned()),
            ..StateRecord::default()
        };
        assert!(needs_replacement(&recorded, "new"));
        assert!(!needs_replacement(&recorded, "old"));
        assert!(!needs_replacement(&StateRecord::default(), "new"));
    }

    #[test]
    fn unchanged_layer_is_skipped() {
        let runtimes = vec!["nodejs20.x".to_owned()];
        let previous = remote("d1", b"zip", Some("artifacts"));
        let plan = plan_publish(
            Some(&previous),
            &desired("d1", b"zip", &runtimes, Some("artifacts")),
        );
        assert_eq!(plan, PublishPlan::Skip);
    }

    #[test]
    fn first_publish_uploads_when_bucket_set() {
        let runtimes = vec!["nodejs20.x".to_owned()];
        assert_eq!(
            plan_publish(None, &desired("d1", b"zip", &runtimes, Some("artifacts"))),
            PublishPlan::Publish { upload: true }
        );
        assert_eq!(
            plan_publish(None, &desired("d1", b"zip", &runtimes, None)),
            PublishPlan::Publish { upload: false }
        );
    }

    #[test]
    fn metadata_change_reuses_uploaded_object() {
        let runtimes = vec!["nodejs20.x".to_owned()];
        let previous = remote("d1", b"zip", Some("artifacts"));
        assert_eq!(
            plan_publish(
                Some(&previous),
                &desired("d2", b"zip", &runtimes, Some("artifacts"))
            ),
            PublishPlan::Publish { upload: false }
        );
    }

    #[test]
    fn content_or_bucket_change_uploads() {
        let runtimes = vec!["nodejs20.x".to_owned()];
        let previous = remote("d1", b"zip", Some("artifacts"));
        assert_eq!(
            plan_publish(
                Some(&previous),
                &desired("d1", b"other", &runtimes, Some("artifacts"))
            ),
            PublishPlan::Publish { upload: true }
        );
        assert_eq!(
            plan_publish(
                Some(&previous),
                &desired("d1", b"zip", &runtimes, Some("elsewhere"))
            ),
            PublishPlan::Publish { upload: true }
        );
    }

    #[test]
    fn dropping_the_bucket_republishes_inline() {
        let runtimes = vec!["nodejs20.x".to_owned()];
        let previous = remote("d1", b"zip", Some("artifacts"));
        assert_eq!(
            plan_publish(Some(&previous), &desired("d1", b"zip", &runtimes, None)),
            PublishPlan::Publish { upload: false }
        );
    }

    #[test]
    fn phase_follows_ownership() {
        assert_eq!(LayerPhase::of(&StateRecord::default()), LayerPhase::Absent);
        let owned = StateRecord {
            name: Some("deps".to_owned()),
            arn: Some(LayerArn::parse("arn:aws:lambda:us-east-1:1:layer:deps").unwrap()),
            ..StateRecord::default()
        };
        assert_eq!(LayerPhase::of(&owned), LayerPhase::Published);
        assert_eq!(LayerPhase::Replaced.to_string(), "replaced");
    }
}
