//! Core types for Lamina.
//!
//! This crate holds everything the other Lamina crates agree on:
//!
//! - **Types**: desired layer configuration, packaged artifacts, remote layer
//!   descriptors and the persisted [`StateRecord`]
//! - **ARNs**: validated layer and layer-version identifiers
//! - **Digests**: SHA-256 content identity in the provider's encoding
//! - **Change detection**: the pure function deciding whether a layer must be
//!   republished
//! - **Identifiers**: an injectable id source for statement ids and cache keys

#![forbid(unsafe_code)]

pub mod arn;
pub mod change;
pub mod digest;
pub mod error;
pub mod ids;
pub mod types;

pub use arn::{LayerArn, LayerVersionArn};
pub use change::{changed, DesiredLayer};
pub use digest::CodeDigest;
pub use error::{LayerError, LayerResult};
pub use ids::{IdSource, SequentialIds, UlidIds};
pub use types::{
    DeployOutput, LayerContent, LayerSpec, PackagedArtifact, PublishRequest, PublishedVersion,
    RemoteLayerDescriptor, RemoveOutput, StateRecord, DEFAULT_DESCRIPTION, DEFAULT_REGION,
};
