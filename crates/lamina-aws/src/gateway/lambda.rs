//! Gateway backed by the AWS Lambda API.

use async_trait::async_trait;
use aws_sdk_lambda::config::retry::RetryConfig;
use aws_sdk_lambda::error::{DisplayErrorContext, SdkError};
use aws_sdk_lambda::operation::add_layer_version_permission::AddLayerVersionPermissionError;
use aws_sdk_lambda::operation::delete_layer_version::DeleteLayerVersionError;
use aws_sdk_lambda::operation::get_layer_version::GetLayerVersionError;
use aws_sdk_lambda::operation::list_layer_versions::ListLayerVersionsError;
use aws_sdk_lambda::operation::publish_layer_version::PublishLayerVersionError;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{LayerVersionContentInput, Runtime};
use aws_sdk_lambda::Client;
use lamina_core::{
    CodeDigest, LayerArn, LayerContent, LayerError, LayerResult, LayerVersionArn, PublishRequest,
    PublishedVersion, RemoteLayerDescriptor,
};
use tracing::{debug, warn};

use super::{LayerGateway, GET_LAYER_VERSION_ACTION};
use crate::client::{load_sdk_config, AwsConfig};

/// [`LayerGateway`] over one Lambda client.
///
/// The client is built once and owned by the gateway; its configuration is
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LambdaGateway {
    client: Client,
}

impl LambdaGateway {
    /// Build a gateway for `region`, resolving credentials up front.
    pub async fn connect(region: &str, config: &AwsConfig) -> LayerResult<Self> {
        let sdk_config = load_sdk_config(region).await?;

        let mut builder = aws_sdk_lambda::config::Builder::from(&sdk_config)
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts));
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self::with_client(Client::from_conf(builder.build())))
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LayerGateway for LambdaGateway {
    async fn publish(&self, request: PublishRequest) -> LayerResult<PublishedVersion> {
        let content = match request.content {
            LayerContent::S3 { bucket, key } => LayerVersionContentInput::builder()
                .s3_bucket(bucket)
                .s3_key(key),
            LayerContent::Inline(bytes) => {
                LayerVersionContentInput::builder().zip_file(Blob::new(bytes))
            }
        }
        .build();

        let runtimes: Vec<Runtime> = request
            .runtimes
            .iter()
            .map(|r| Runtime::from(r.as_str()))
            .collect();

        debug!(layer = %request.name, "calling PublishLayerVersion");
        let output = self
            .client
            .publish_layer_version()
            .layer_name(&request.name)
            .description(&request.description)
            .set_compatible_runtimes((!runtimes.is_empty()).then_some(runtimes))
            .content(content)
            .send()
            .await
            .map_err(|e| provider_error::<PublishLayerVersionError>("PublishLayerVersion", &e))?;

        let layer_arn = output
            .layer_arn()
            .ok_or_else(|| LayerError::provider("PublishLayerVersion", "response had no LayerArn"))
            .and_then(LayerArn::parse)?;
        let version_arn = output
            .layer_version_arn()
            .ok_or_else(|| {
                LayerError::provider("PublishLayerVersion", "response had no LayerVersionArn")
            })
            .and_then(LayerVersionArn::parse)?;
        let version = u64::try_from(output.version()).map_err(|_| {
            LayerError::provider(
                "PublishLayerVersion",
                format!("negative version {}", output.version()),
            )
        })?;

        Ok(PublishedVersion {
            layer_arn,
            version_arn,
            version,
        })
    }

    async fn fetch(&self, arn: &LayerVersionArn) -> LayerResult<Option<RemoteLayerDescriptor>> {
        debug!(arn = %arn, "calling GetLayerVersion");
        let result = self
            .client
            .get_layer_version()
            .layer_name(arn.name())
            .version_number(version_number(arn)?)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) if is_not_found(&e, GetLayerVersionError::is_resource_not_found_exception) => {
                debug!(arn = %arn, "layer version not found");
                return Ok(None);
            }
            Err(e) => return Err(provider_error("GetLayerVersion", &e)),
        };

        let code_sha256 = output
            .content()
            .and_then(|c| c.code_sha256())
            .ok_or_else(|| LayerError::provider("GetLayerVersion", "response had no CodeSha256"))?;
        let version_arn = match output.layer_version_arn() {
            Some(raw) => LayerVersionArn::parse(raw)?,
            None => arn.clone(),
        };

        Ok(Some(RemoteLayerDescriptor {
            name: arn.name().to_owned(),
            description: output.description().unwrap_or_default().to_owned(),
            content_hash: CodeDigest::from_base64(code_sha256)?,
            runtimes: output
                .compatible_runtimes()
                .iter()
                .map(|r| r.as_str().to_owned())
                .collect(),
            version_arn,
            bucket: None,
        }))
    }

    async fn delete_version(&self, arn: &LayerVersionArn) -> LayerResult<()> {
        debug!(arn = %arn, "calling DeleteLayerVersion");
        let result = self
            .client
            .delete_layer_version()
            .layer_name(arn.name())
            .version_number(version_number(arn)?)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if is_not_found(&e, DeleteLayerVersionError::is_resource_not_found_exception) =>
            {
                warn!(arn = %arn, "layer version already deleted");
                Ok(())
            }
            Err(e) => Err(provider_error("DeleteLayerVersion", &e)),
        }
    }

    async fn list_versions(&self, name: &str) -> LayerResult<Vec<u64>> {
        let mut versions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            debug!(layer = %name, marker = ?marker, "calling ListLayerVersions");
            let result = self
                .client
                .list_layer_versions()
                .layer_name(name)
                .set_marker(marker.take())
                .send()
                .await;

            let output = match result {
                Ok(output) => output,
                Err(e)
                    if is_not_found(&e, ListLayerVersionsError::is_resource_not_found_exception) =>
                {
                    return Ok(Vec::new());
                }
                Err(e) => return Err(provider_error("ListLayerVersions", &e)),
            };

            versions.extend(
                output
                    .layer_versions()
                    .iter()
                    .filter_map(|v| u64::try_from(v.version()).ok()),
            );

            match output.next_marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_owned()),
                _ => break,
            }
        }

        versions.sort_unstable();
        versions.dedup();
        Ok(versions)
    }

    async fn add_permission(&self, arn: &LayerVersionArn, statement_id: &str) -> LayerResult<()> {
        debug!(arn = %arn, statement_id = %statement_id, "calling AddLayerVersionPermission");
        self.client
            .add_layer_version_permission()
            .layer_name(arn.name())
            .version_number(version_number(arn)?)
            .statement_id(statement_id)
            .action(GET_LAYER_VERSION_ACTION)
            .principal("*")
            .send()
            .await
            .map_err(|e| {
                provider_error::<AddLayerVersionPermissionError>("AddLayerVersionPermission", &e)
            })?;
        Ok(())
    }
}

fn version_number(arn: &LayerVersionArn) -> LayerResult<i64> {
    i64::try_from(arn.version())
        .map_err(|_| LayerError::InvalidArn(format!("version out of range: {arn}")))
}

fn is_not_found<E, R>(err: &SdkError<E, R>, check: impl Fn(&E) -> bool) -> bool {
    err.as_service_error().is_some_and(check)
}

fn provider_error<E>(operation: &'static str, err: &SdkError<E>) -> LayerError
where
    E: std::error::Error + 'static,
{
    LayerError::provider(operation, DisplayErrorContext(err).to_string())
}
