//! AWS Cost Explorer cost category adapter

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_costexplorer::Client;
use aws_sdk_costexplorer::error::DisplayErrorContext;
use aws_sdk_costexplorer::types::{
    CostCategoryRule as SdkRule, CostCategoryRuleType, CostCategoryRuleVersion, Dimension,
    DimensionValues, Expression, MatchOption, ResourceTag,
};
use costcat_sync_domain::{
    CostCategoryApi, CostCategoryDefinition, CostCategoryError, CostCategoryRule, EffectiveStart,
    LINKED_ACCOUNT_DIMENSION, OwnershipMarker, RULE_VERSION, RemoteDefinitionIndex,
};

/// Cost category API backed by Cost Explorer
pub struct CostExplorerApi {
    client: Client,
}

impl CostExplorerApi {
    pub fn new(config: &SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn is_owned(
        &self,
        arn: &str,
        marker: &OwnershipMarker,
    ) -> Result<bool, CostCategoryError> {
        let tags = self
            .client
            .list_tags_for_resource()
            .resource_arn(arn)
            .send()
            .await
            .map_err(api_error)?;

        Ok(tags
            .resource_tags()
            .iter()
            .any(|tag| marker.matches(tag.key(), tag.value())))
    }
}

fn api_error(err: impl std::error::Error) -> CostCategoryError {
    CostCategoryError::Api(DisplayErrorContext(err).to_string())
}

/// Convert a domain rule into the SDK rule structure
fn to_sdk_rule(rule: &CostCategoryRule) -> SdkRule {
    let dimension = DimensionValues::builder()
        .key(Dimension::from(LINKED_ACCOUNT_DIMENSION))
        .set_values(Some(rule.accounts.clone()))
        .match_options(MatchOption::Equals)
        .build();

    SdkRule::builder()
        .value(&rule.value)
        .rule(Expression::builder().dimensions(dimension).build())
        .r#type(CostCategoryRuleType::Regular)
        .build()
}

fn to_sdk_rules(definition: &CostCategoryDefinition) -> Vec<SdkRule> {
    definition.rules.iter().map(to_sdk_rule).collect()
}

#[async_trait]
impl CostCategoryApi for CostExplorerApi {
    async fn list_owned_definitions(
        &self,
        marker: &OwnershipMarker,
    ) -> Result<RemoteDefinitionIndex, CostCategoryError> {
        let mut index = RemoteDefinitionIndex::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_cost_category_definitions()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(api_error)?;

            for reference in page.cost_category_references() {
                let (Some(name), Some(arn)) = (reference.name(), reference.cost_category_arn())
                else {
                    continue;
                };
                if self.is_owned(arn, marker).await? {
                    index.insert(name, arn);
                } else {
                    tracing::debug!(category = %name, "Skipping cost category not managed here");
                }
            }

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(index)
    }

    async fn create_definition(
        &self,
        definition: &CostCategoryDefinition,
        effective_start: EffectiveStart,
        marker: &OwnershipMarker,
    ) -> Result<(), CostCategoryError> {
        let tag = ResourceTag::builder()
            .key(&marker.key)
            .value(&marker.value)
            .build()
            .map_err(|e| CostCategoryError::InvalidRequest(e.to_string()))?;

        let output = self
            .client
            .create_cost_category_definition()
            .name(&definition.name)
            .effective_start(effective_start.to_iso8601())
            .rule_version(CostCategoryRuleVersion::from(RULE_VERSION))
            .set_rules(Some(to_sdk_rules(definition)))
            .resource_tags(tag)
            .send()
            .await
            .map_err(api_error)?;

        tracing::debug!(
            category = %definition.name,
            arn = ?output.cost_category_arn(),
            "Created cost category"
        );
        Ok(())
    }

    async fn update_definition(
        &self,
        remote_id: &str,
        definition: &CostCategoryDefinition,
        effective_start: EffectiveStart,
    ) -> Result<(), CostCategoryError> {
        self.client
            .update_cost_category_definition()
            .cost_category_arn(remote_id)
            .effective_start(effective_start.to_iso8601())
            .rule_version(CostCategoryRuleVersion::from(RULE_VERSION))
            .set_rules(Some(to_sdk_rules(definition)))
            .send()
            .await
            .map_err(api_error)?;

        tracing::debug!(category = %definition.name, arn = %remote_id, "Updated cost category");
        Ok(())
    }
}
