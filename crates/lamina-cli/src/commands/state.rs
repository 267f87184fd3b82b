//! Implementation of the `lamina state` command.

use std::path::Path;

use lamina_control::{FileStateStore, StateStore};

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let state = FileStateStore::new(&config.state.path).load().await?;

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
