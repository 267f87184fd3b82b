//! Layer reconciliation engine.
//!
//! A deploy moves the layer `Absent|Published -> Published`, a remove moves it
//! `Published -> Removed`. The decisions are made by the pure functions in
//! [`plan`]; this module performs the remote calls they call for, in order,
//! and persists the result.

mod plan;

pub use plan::{
    needs_replacement, plan_publish, resolve_name, LayerPhase, PublishPlan, ReconcileOutcome,
};

use std::sync::Arc;

use futures::future::join_all;
use lamina_aws::{ArtifactUploader, LayerGateway};
use lamina_core::{
    DeployOutput, DesiredLayer, IdSource, LayerContent, LayerError, LayerResult, LayerSpec,
    PackagedArtifact, PublishRequest, RemoteLayerDescriptor, RemoveOutput, StateRecord,
};
use lamina_package::Packager;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::store::StateStore;

/// Result of a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Values handed back to the caller.
    #[serde(flatten)]
    pub output: DeployOutput,
    /// What the deploy did.
    pub outcome: ReconcileOutcome,
}

/// Drives a layer towards its declared configuration.
pub struct LayerEngine {
    gateway: Arc<dyn LayerGateway>,
    uploader: Arc<dyn ArtifactUploader>,
    packager: Arc<dyn Packager>,
    store: Arc<dyn StateStore>,
    ids: Arc<dyn IdSource>,
}

impl LayerEngine {
    /// Create a new engine.
    pub fn new(
        gateway: Arc<dyn LayerGateway>,
        uploader: Arc<dyn ArtifactUploader>,
        packager: Arc<dyn Packager>,
        store: Arc<dyn StateStore>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            gateway,
            uploader,
            packager,
            store,
            ids,
        }
    }

    /// Current lifecycle phase according to the state store.
    pub async fn phase(&self) -> LayerResult<LayerPhase> {
        Ok(LayerPhase::of(&self.store.load().await?))
    }

    /// Reconcile the layer with `spec`.
    ///
    /// 1. Delete the recorded version if the layer was renamed
    /// 2. Package the code
    /// 3. Describe the recorded version, if any
    /// 4. Stop if nothing publishable changed
    /// 5. Upload the archive when the bucket needs it
    /// 6. Publish and persist the new state
    /// 7. Grant public read if requested
    pub async fn deploy(&self, spec: &LayerSpec) -> LayerResult<DeployReport> {
        let mut state = self.store.load().await?;
        let name = resolve_name(spec, &state, self.ids.as_ref());
        info!(layer = %name, phase = %LayerPhase::of(&state), "deploying layer");

        let replaced = needs_replacement(&state, &name);
        if replaced {
            self.replace(&mut state, &name).await?;
        }

        info!(layer = %name, code = %spec.code.display(), "packaging layer");
        let artifact = self
            .packager
            .pack(&spec.code, spec.prefix.as_deref(), &spec.include)
            .await?;
        debug!(
            layer = %name,
            path = %artifact.path.display(),
            hash = %artifact.content_hash,
            "packaged layer"
        );

        let previous = self.describe_recorded(&state).await?;
        let desired = DesiredLayer::new(spec, &artifact);

        let upload = match plan_publish(previous.as_ref(), &desired) {
            PublishPlan::Skip => {
                info!(layer = %name, "layer unchanged");
                return Ok(DeployReport {
                    output: DeployOutput::from(&state),
                    outcome: ReconcileOutcome::Unchanged,
                });
            }
            PublishPlan::Publish { upload } => upload,
        };

        let content = match spec.bucket.as_deref() {
            Some(bucket) => {
                let key = artifact.object_key();
                if upload {
                    info!(layer = %name, bucket = %bucket, key = %key, "uploading layer archive");
                    self.uploader.upload(bucket, &key, &artifact.path).await?;
                } else {
                    debug!(layer = %name, bucket = %bucket, key = %key, "archive already uploaded");
                }
                LayerContent::S3 {
                    bucket: bucket.to_owned(),
                    key,
                }
            }
            None => LayerContent::Inline(read_archive(&artifact).await?),
        };

        info!(layer = %name, "publishing layer version");
        let published = self
            .gateway
            .publish(PublishRequest {
                name: name.clone(),
                description: spec.description.clone(),
                runtimes: spec.runtimes.clone(),
                content,
            })
            .await?;

        // The new version must be recorded before the grant can fail.
        let state = StateRecord::published(&name, &published, &spec.region, spec.bucket.clone());
        self.store.save(&state).await?;

        if spec.public {
            let statement_id = self.ids.next_id();
            info!(arn = %published.version_arn, statement_id = %statement_id, "granting public read");
            self.gateway
                .add_permission(&published.version_arn, &statement_id)
                .await?;
        }

        info!(
            layer = %name,
            version = published.version,
            arn = %published.version_arn,
            "layer published"
        );

        Ok(DeployReport {
            output: DeployOutput::from(&state),
            outcome: if replaced {
                ReconcileOutcome::Replaced
            } else {
                ReconcileOutcome::Published
            },
        })
    }

    /// Delete every version of the owned layer and clear the state.
    ///
    /// A no-op when nothing is owned. Deletes run concurrently; if any fails
    /// the first error is returned once all have settled and the state is
    /// kept so the removal can be retried.
    pub async fn remove(&self) -> LayerResult<RemoveOutput> {
        let state = self.store.load().await?;
        let (Some(name), Some(arn)) = (state.name.as_deref(), state.arn.as_ref()) else {
            info!("no layer recorded, nothing to remove");
            return Ok(RemoveOutput::default());
        };

        let versions = self.gateway.list_versions(name).await?;
        info!(layer = %name, count = versions.len(), "removing layer versions");

        let results = join_all(versions.iter().map(|&version| {
            let version_arn = arn.version(version);
            async move {
                let result = self.gateway.delete_version(&version_arn).await;
                if let Err(e) = &result {
                    warn!(arn = %version_arn, error = %e, "failed to delete layer version");
                }
                result
            }
        }))
        .await;

        if let Some(err) = results.into_iter().find_map(Result::err) {
            return Err(err);
        }

        self.store.clear().await?;
        info!(layer = %name, phase = %LayerPhase::Removed, "layer removed");
        Ok(RemoveOutput::default())
    }

    async fn replace(&self, state: &mut StateRecord, name: &str) -> LayerResult<()> {
        let recorded = state.name.as_deref().unwrap_or_default();
        match &state.version_arn {
            Some(arn) => {
                info!(from = %recorded, to = %name, arn = %arn, "replacing layer");
                self.gateway.delete_version(arn).await?;
            }
            None => info!(from = %recorded, to = %name, "replacing layer"),
        }
        *state = StateRecord::default();
        Ok(())
    }

    async fn describe_recorded(
        &self,
        state: &StateRecord,
    ) -> LayerResult<Option<RemoteLayerDescriptor>> {
        let Some(arn) = &state.version_arn else {
            return Ok(None);
        };

        let descriptor = self.gateway.fetch(arn).await?;
        if descriptor.is_none() {
            warn!(arn = %arn, "recorded layer version no longer exists");
        }
        Ok(descriptor.map(|d| d.with_recorded_bucket(state.bucket.clone())))
    }
}

impl std::fmt::Debug for LayerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerEngine").finish_non_exhaustive()
    }
}

async fn read_archive(artifact: &PackagedArtifact) -> LayerResult<Vec<u8>> {
    tokio::fs::read(&artifact.path).await.map_err(|e| {
        LayerError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read {}: {e}", artifact.path.display()),
        ))
    })
}
