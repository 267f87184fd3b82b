//! Implementation of the `lamina deploy` command.

use std::path::Path;

use tracing::info;

use super::{connect, load_config, print_outputs};

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let engine = connect(&config, &config.layer.region).await?;

    let report = engine.deploy(&config.layer).await?;
    info!(outcome = %report.outcome, "deploy finished");

    let output = report.output;
    print_outputs(&[
        ("name", output.name),
        ("region", output.region),
        (
            "version",
            output.version.map(|v| v.to_string()).unwrap_or_default(),
        ),
        (
            "arn",
            output.arn.map(|a| a.to_string()).unwrap_or_default(),
        ),
        (
            "arnVersion",
            output.arn_version.map(|a| a.to_string()).unwrap_or_default(),
        ),
        ("outcome", report.outcome.to_string()),
    ]);
    Ok(())
}
