//! AWS adapters for Lamina.
//!
//! - [`LayerGateway`]: publish, fetch, delete and list layer versions, with
//!   provider "not found" responses folded into absent values
//! - [`ArtifactUploader`]: put packaged archives into object storage before a
//!   bucket-backed publish
//!
//! Each trait has a real implementation ([`LambdaGateway`], [`S3Uploader`])
//! and an in-memory one ([`MemoryGateway`], [`MemoryUploader`]) that behaves
//! like the provider for tests and dry runs.

#![forbid(unsafe_code)]

pub mod client;
pub mod gateway;
pub mod upload;

pub use client::{load_sdk_config, AwsConfig};
pub use gateway::{LambdaGateway, LayerGateway, MemoryGateway};
pub use upload::{ArtifactUploader, MemoryUploader, S3Uploader};
