//! AWS SDK adapters
//!
//! - `organizations`: organization tree and account tags
//! - `cost_explorer`: cost category definitions
//! - `ssm`: digests in Parameter Store

mod cost_explorer;
mod organizations;
mod ssm;

pub use cost_explorer::CostExplorerApi;
pub use organizations::OrganizationsHierarchySource;
pub use ssm::SsmDigestStore;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Overrides applied on top of the default AWS configuration chain
#[derive(Debug, Clone, Default)]
pub struct AwsSettings {
    /// Region (falls back to environment/profile configuration)
    pub region: Option<String>,
    /// Custom endpoint, e.g. a local emulator
    pub endpoint_url: Option<String>,
}

/// Load the shared SDK configuration used by every AWS adapter
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}
