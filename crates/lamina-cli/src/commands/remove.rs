//! Implementation of the `lamina remove` command.

use std::path::Path;

use lamina_control::{FileStateStore, StateStore};

use super::{connect, load_config};

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    // Versions live where they were published, not where the config now points.
    let state = FileStateStore::new(&config.state.path).load().await?;
    let region = state.region.as_deref().unwrap_or(&config.layer.region);

    let engine = connect(&config, region).await?;
    engine.remove().await?;

    println!("Layer removed.");
    Ok(())
}
