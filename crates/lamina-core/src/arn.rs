//! Layer ARNs.
//!
//! A layer ARN looks like `arn:aws:lambda:us-east-1:123456789012:layer:name`
//! and a version ARN appends `:<version>`. Only the trailing segments are
//! interpreted; the partition, region and account are carried opaquely.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, LayerResult};

/// Version-independent layer ARN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerArn(String);

impl LayerArn {
    /// Parse a layer ARN, requiring a non-empty trailing name segment.
    pub fn parse(arn: impl Into<String>) -> LayerResult<Self> {
        let arn = arn.into();
        match arn.rsplit_once(':') {
            Some((_, name)) if !name.is_empty() => Ok(Self(arn)),
            _ => Err(LayerError::InvalidArn(arn)),
        }
    }

    /// Build the ARN of layer `name` owned by `account` in `region`.
    #[must_use]
    pub fn from_parts(region: &str, account: &str, name: &str) -> Self {
        Self(format!("arn:aws:lambda:{region}:{account}:layer:{name}"))
    }

    /// Layer name (the last segment).
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or_default()
    }

    /// ARN of a specific version of this layer.
    #[must_use]
    pub fn version(&self, version: u64) -> LayerVersionArn {
        LayerVersionArn {
            arn: format!("{}:{version}", self.0),
            name_start: self.0.len() - self.name().len(),
            version,
        }
    }

    /// Get the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ARN of one immutable layer version.
///
/// The last two colon-delimited segments are `<layer-name>:<version-number>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerVersionArn {
    arn: String,
    name_start: usize,
    version: u64,
}

impl LayerVersionArn {
    /// Parse a version ARN.
    ///
    /// Fails when there are fewer than two segments, the name is empty or the
    /// version is not a non-negative integer.
    pub fn parse(arn: impl Into<String>) -> LayerResult<Self> {
        let arn = arn.into();
        let Some((rest, version)) = arn.rsplit_once(':') else {
            return Err(LayerError::InvalidArn(arn));
        };
        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LayerError::InvalidArn(arn));
        }
        let Ok(version) = version.parse::<u64>() else {
            return Err(LayerError::InvalidArn(arn));
        };
        let name_start = rest.rfind(':').map_or(0, |i| i + 1);
        if rest[name_start..].is_empty() {
            return Err(LayerError::InvalidArn(arn));
        }

        Ok(Self {
            arn,
            name_start,
            version,
        })
    }

    /// Layer name encoded in the ARN.
    #[must_use]
    pub fn name(&self) -> &str {
        let end = self.arn.len() - self.version_len() - 1;
        &self.arn[self.name_start..end]
    }

    /// Version number encoded in the ARN.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The version-independent layer ARN.
    #[must_use]
    pub fn layer_arn(&self) -> LayerArn {
        let end = self.arn.len() - self.version_len() - 1;
        LayerArn(self.arn[..end].to_owned())
    }

    /// Get the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.arn
    }

    fn version_len(&self) -> usize {
        self.arn.len() - self.arn.rfind(':').map_or(0, |i| i + 1)
    }
}

impl fmt::Display for LayerVersionArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arn)
    }
}

impl FromStr for LayerVersionArn {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LayerVersionArn {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.arn)
    }
}

impl<'de> Deserialize<'de> for LayerVersionArn {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LAYER: &str = "arn:aws:lambda:us-east-1:123456789012:layer:my-layer";

    #[test]
    fn parses_name_and_version() {
        let arn = LayerVersionArn::parse(format!("{LAYER}:7")).unwrap();
        assert_eq!(arn.name(), "my-layer");
        assert_eq!(arn.version(), 7);
        assert_eq!(arn.layer_arn().as_str(), LAYER);
    }

    #[test]
    fn parses_bare_name_version_pair() {
        let arn = LayerVersionArn::parse("deps:12").unwrap();
        assert_eq!(arn.name(), "deps");
        assert_eq!(arn.version(), 12);
    }

    #[test]
    fn rejects_malformed_version_arns() {
        for raw in [
            "",
            "no-colons",
            "layer:",
            "layer:abc",
            ":3",
            "a::3",
            "layer:-1",
            "layer:+1",
            "layer: 1",
            "layer:1a",
        ] {
            assert!(
                matches!(LayerVersionArn::parse(raw), Err(LayerError::InvalidArn(_))),
                "{raw} should not parse"
            );
        }
    }

    #[test]
    fn layer_arn_from_parts() {
        let layer = LayerArn::from_parts("us-east-1", "123456789012", "my-layer");
        assert_eq!(layer.as_str(), LAYER);
        assert_eq!(layer.name(), "my-layer");
    }

    #[test]
    fn layer_arn_builds_version_arns() {
        let layer = LayerArn::parse(LAYER).unwrap();
        assert_eq!(layer.name(), "my-layer");

        let v3 = layer.version(3);
        assert_eq!(v3.as_str(), format!("{LAYER}:3"));
        assert_eq!(v3.name(), "my-layer");
        assert_eq!(v3.version(), 3);
        assert_eq!(v3, LayerVersionArn::parse(format!("{LAYER}:3")).unwrap());
    }

    #[test]
    fn version_arn_serde_round_trips_as_string() {
        let arn = LayerVersionArn::parse(format!("{LAYER}:1")).unwrap();
        let json = serde_json::to_string(&arn).unwrap();
        assert_eq!(json, format!("\"{LAYER}:1\""));

        let bad: Result<LayerVersionArn, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
