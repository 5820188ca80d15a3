//! CloudFormation custom resource response adapter

use async_trait::async_trait;
use costcat_sync_domain::{LifecycleEvent, LifecycleNotifier, NotifyError};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::time::Duration;

const SUCCESS: &str = "SUCCESS";

/// Sends custom resource responses to the presigned ResponseURL
pub struct CloudFormationNotifier {
    client: Client,
    log_stream_name: String,
}

impl CloudFormationNotifier {
    /// `log_stream_name` identifies where the run's logs can be found; it is
    /// used as the physical resource id.
    pub fn new(log_stream_name: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        Ok(Self {
            client,
            log_stream_name: log_stream_name.into(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseBody<'a> {
    status: &'a str,
    reason: String,
    physical_resource_id: &'a str,
    stack_id: &'a str,
    request_id: &'a str,
    logical_resource_id: &'a str,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, NotifyError> {
    value.as_deref().ok_or(NotifyError::MissingField(field))
}

#[async_trait]
impl LifecycleNotifier for CloudFormationNotifier {
    async fn send_success(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        let response_url = event
            .response_url
            .as_ref()
            .ok_or(NotifyError::MissingField("ResponseURL"))?;

        let body = ResponseBody {
            status: SUCCESS,
            reason: format!(
                "See details in CloudWatch Log Stream: {}",
                self.log_stream_name
            ),
            physical_resource_id: &self.log_stream_name,
            stack_id: required(&event.stack_id, "StackId")?,
            request_id: required(&event.request_id, "RequestId")?,
            logical_resource_id: required(&event.logical_resource_id, "LogicalResourceId")?,
        };
        let data =
            serde_json::to_vec(&body).map_err(|e| NotifyError::Rejected(e.to_string()))?;

        tracing::debug!(
            status = SUCCESS,
            request_id = body.request_id,
            "Sending lifecycle response"
        );

        // The presigned URL is signed without a content type
        let response = self
            .client
            .put(response_url.expose_secret())
            .header(CONTENT_TYPE, "")
            .body(data)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.without_url().to_string()))?;

        let code = response.status();
        if !code.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{}: {}", code, text)));
        }

        tracing::info!(status = SUCCESS, "Lifecycle response delivered");
        Ok(())
    }
}
