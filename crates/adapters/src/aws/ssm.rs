//! SSM Parameter Store digest adapter

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::types::{ParameterTier, ParameterType};
use costcat_sync_domain::{DIGEST_SENTINEL, DigestStore, DigestStoreError};

const PARAMETER_DESCRIPTION: &str = "AWS Organization and Org Units digest";

/// Digest store backed by String parameters
pub struct SsmDigestStore {
    client: Client,
}

impl SsmDigestStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DigestStore for SsmDigestStore {
    async fn get_digest(&self, key: &str) -> Result<String, DigestStoreError> {
        match self.client.get_parameter().name(key).send().await {
            Ok(output) => Ok(output
                .parameter()
                .and_then(|parameter| parameter.value())
                .map(str::to_string)
                .unwrap_or_else(|| DIGEST_SENTINEL.to_string())),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found()) =>
            {
                tracing::debug!(key = %key, "Digest parameter not found");
                Ok(DIGEST_SENTINEL.to_string())
            }
            Err(err) => Err(DigestStoreError::Storage(
                DisplayErrorContext(&err).to_string(),
            )),
        }
    }

    async fn put_digest(&self, key: &str, value: &str) -> Result<(), DigestStoreError> {
        self.client
            .put_parameter()
            .name(key)
            .description(PARAMETER_DESCRIPTION)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .tier(ParameterTier::Standard)
            .data_type("text")
            .send()
            .await
            .map_err(|err| DigestStoreError::Storage(DisplayErrorContext(&err).to_string()))?;

        tracing::debug!(key = %key, "Stored digest parameter");
        Ok(())
    }
}
