//! Subcommand implementations.

pub mod deploy;
pub mod remove;
pub mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use lamina_aws::{LambdaGateway, S3Uploader};
use lamina_control::{FileStateStore, LaminaConfig, LayerEngine};
use lamina_core::{IdSource, UlidIds};
use lamina_package::ArchivePackager;

/// Load configuration from `path`, or from `lamina.toml` when not given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LaminaConfig> {
    let config = match path {
        Some(path) => LaminaConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => LaminaConfig::load()?,
    };
    Ok(config)
}

/// Build an engine talking to AWS in `region`.
pub async fn connect(config: &LaminaConfig, region: &str) -> anyhow::Result<LayerEngine> {
    let gateway = LambdaGateway::connect(region, &config.aws).await?;
    let uploader = S3Uploader::new(region, &config.aws);
    let ids: Arc<dyn IdSource> = Arc::new(UlidIds);
    let packager = ArchivePackager::new(&config.package)?.with_ids(Arc::clone(&ids));
    let store = FileStateStore::new(&config.state.path);

    Ok(LayerEngine::new(
        Arc::new(gateway),
        Arc::new(uploader),
        Arc::new(packager),
        Arc::new(store),
        ids,
    ))
}

/// Print `key value` pairs with the values aligned.
pub fn print_outputs(outputs: &[(&str, String)]) {
    let width = outputs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in outputs {
        println!("  {key:<width$}  {value}");
    }
}
