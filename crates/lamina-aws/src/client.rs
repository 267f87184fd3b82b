//! AWS SDK configuration.
//!
//! One SDK configuration is loaded per gateway at startup and handed to the
//! clients built from it. Nothing here touches process-global state.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use lamina_core::{LayerError, LayerResult};
use serde::Deserialize;
use tracing::debug;

/// Connection settings shared by the Lambda and S3 clients.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    /// Custom endpoint, e.g. LocalStack.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Attempts per API call made by the SDK transport. Lamina itself never
    /// retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

const fn default_max_attempts() -> u32 {
    1
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_attempts: default_max_attempts(),
        }
    }
}

/// Load SDK configuration for `region` and make sure credentials resolve.
///
/// Missing credentials are a configuration error raised before any API call.
pub async fn load_sdk_config(region: &str) -> LayerResult<SdkConfig> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await;

    let provider = sdk_config
        .credentials_provider()
        .ok_or_else(|| LayerError::config("AWS credentials not found"))?;
    provider
        .provide_credentials()
        .await
        .map_err(|e| LayerError::config(format!("AWS credentials not found: {e}")))?;

    debug!(region = %region, "loaded AWS configuration");
    Ok(sdk_config)
}
