//! Layer reconciliation for Lamina.
//!
//! [`LayerEngine`] drives a layer from its recorded state towards the
//! declared [`LayerSpec`](lamina_core::LayerSpec): it packages the code,
//! decides whether anything publishable changed, publishes a new version when
//! it did, and removes every version on teardown. The remote API, object
//! storage, packager and state store are injected, so the engine runs the
//! same against AWS and against the in-memory doubles.

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod store;

pub use config::{LaminaConfig, StateConfig};
pub use engine::{
    needs_replacement, plan_publish, resolve_name, DeployReport, LayerEngine, LayerPhase,
    PublishPlan, ReconcileOutcome,
};
pub use store::{FileStateStore, MemoryStateStore, StateStore};
