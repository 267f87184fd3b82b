//! Configuration for Lamina.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use lamina_aws::AwsConfig;
use lamina_core::{LayerError, LayerResult, LayerSpec};
use lamina_package::PackagerConfig;
use serde::Deserialize;

/// Default configuration file.
pub const CONFIG_FILE: &str = "lamina.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "LAMINA_";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LaminaConfig {
    /// The layer to reconcile.
    #[serde(default)]
    pub layer: LayerSpec,

    /// Archive packaging.
    #[serde(default)]
    pub package: PackagerConfig,

    /// AWS client settings.
    #[serde(default)]
    pub aws: AwsConfig,

    /// State persistence.
    #[serde(default)]
    pub state: StateConfig,
}

impl LaminaConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `lamina.toml` in the current directory (if present)
    /// 3. Environment variables with `LAMINA_` prefix, nested keys split on `__`
    pub fn load() -> LayerResult<Self> {
        Self::from_file(CONFIG_FILE)
    }

    /// Load configuration from a specific TOML file, still honouring
    /// environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> LayerResult<Self> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| LayerError::Config(e.to_string()))
    }
}

/// State persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// JSON file holding the state record.
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".lamina/state.json")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LaminaConfig::default();
        assert_eq!(config.layer.description, "Serverless Layer");
        assert_eq!(config.layer.region, "us-east-1");
        assert_eq!(config.package.manifest, "package.json");
        assert_eq!(config.package.format, "zip");
        assert_eq!(config.aws.max_attempts, 1);
        assert_eq!(config.state.path, PathBuf::from(".lamina/state.json"));
    }

    #[test]
    fn config_from_toml() {
        let toml = r#"
            [layer]
            name = "deps"
            description = "shared dependencies"
            code = "layer/nodejs"
            runtimes = ["nodejs20.x", "nodejs18.x"]
            prefix = "nodejs"
            bucket = "artifacts"
            public = true

            [package]
            format = "tar"

            [aws]
            endpoint = "http://localhost:4566"
            max_attempts = 3

            [state]
            path = "state/deps.json"
        "#;

        let config: LaminaConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.layer.name.as_deref(), Some("deps"));
        assert_eq!(config.layer.runtimes, vec!["nodejs20.x", "nodejs18.x"]);
        assert_eq!(config.layer.prefix.as_deref(), Some("nodejs"));
        assert_eq!(config.layer.bucket.as_deref(), Some("artifacts"));
        assert_eq!(config.layer.region, "us-east-1");
        assert!(config.layer.public);
        assert_eq!(config.package.format, "tar");
        assert_eq!(config.package.manifest, "package.json");
        assert_eq!(config.aws.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(config.aws.max_attempts, 3);
        assert_eq!(config.state.path, PathBuf::from("state/deps.json"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LaminaConfig::from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.layer.code, PathBuf::from("."));
        assert!(config.layer.bucket.is_none());
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lamina.toml");
        std::fs::write(&path, "[layer]\nruntimes = \"not-a-list\"\n").unwrap();

        let err = LaminaConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, LayerError::Config(_)));
    }
}
