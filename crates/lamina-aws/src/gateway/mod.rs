//! Remote layer gateway.
//!
//! The layer API has no update: every change publishes a new immutable
//! version. The gateway exposes exactly the calls reconciliation needs and
//! makes all of them safe to repeat. A missing version is `None` on fetch and
//! success on delete.

mod lambda;
mod memory;

pub use lambda::LambdaGateway;
pub use memory::MemoryGateway;

use async_trait::async_trait;
use lamina_core::{
    LayerResult, LayerVersionArn, PublishRequest, PublishedVersion, RemoteLayerDescriptor,
};

/// Action granted by [`LayerGateway::add_permission`].
pub const GET_LAYER_VERSION_ACTION: &str = "lambda:GetLayerVersion";

/// Access to the remote layer API.
#[async_trait]
pub trait LayerGateway: Send + Sync {
    /// Publish a new version. Never updates an existing one.
    async fn publish(&self, request: PublishRequest) -> LayerResult<PublishedVersion>;

    /// Describe one version.
    ///
    /// Returns `None` if the version does not exist.
    async fn fetch(&self, arn: &LayerVersionArn) -> LayerResult<Option<RemoteLayerDescriptor>>;

    /// Delete one version. Deleting a missing version succeeds.
    async fn delete_version(&self, arn: &LayerVersionArn) -> LayerResult<()>;

    /// All version numbers of a layer, ascending. Unknown layers have none.
    async fn list_versions(&self, name: &str) -> LayerResult<Vec<u64>>;

    /// Allow every account to read the given version.
    async fn add_permission(&self, arn: &LayerVersionArn, statement_id: &str) -> LayerResult<()>;
}
