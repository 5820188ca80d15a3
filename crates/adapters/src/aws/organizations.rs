//! AWS Organizations hierarchy adapter

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_organizations::Client;
use aws_sdk_organizations::error::DisplayErrorContext;
use costcat_sync_domain::{HierarchyError, HierarchySource, TagAssignment};

/// Reads roots, units, accounts and tags from AWS Organizations
pub struct OrganizationsHierarchySource {
    client: Client,
}

impl OrganizationsHierarchySource {
    pub fn new(config: &SdkConfig) -> Self {
        Self::from_client(Client::new(config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn api_error(err: impl std::error::Error) -> HierarchyError {
    HierarchyError::Api(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl HierarchySource for OrganizationsHierarchySource {
    async fn list_roots(&self) -> Result<Vec<String>, HierarchyError> {
        let mut roots = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_roots()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(api_error)?;

            roots.extend(page.roots().iter().filter_map(|r| r.id().map(str::to_string)));

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(roots)
    }

    async fn list_child_units(&self, parent_id: &str) -> Result<Vec<String>, HierarchyError> {
        let mut units = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_organizational_units_for_parent()
                .parent_id(parent_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(api_error)?;

            units.extend(
                page.organizational_units()
                    .iter()
                    .filter_map(|unit| unit.id().map(str::to_string)),
            );

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        tracing::trace!(parent = %parent_id, children = units.len(), "Listed child units");
        Ok(units)
    }

    async fn list_accounts(&self) -> Result<Vec<String>, HierarchyError> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_accounts()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(api_error)?;

            accounts.extend(
                page.accounts()
                    .iter()
                    .filter_map(|account| account.id().map(str::to_string)),
            );

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(accounts)
    }

    async fn tags_for(&self, resource_id: &str) -> Result<Vec<TagAssignment>, HierarchyError> {
        let mut tags = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_tags_for_resource()
                .resource_id(resource_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(api_error)?;

            tags.extend(
                page.tags()
                    .iter()
                    .map(|tag| TagAssignment::new(tag.key(), tag.value())),
            );

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::test_support::{aws_json, sdk_config, target};
    use costcat_sync_domain::usecases::collect_snapshot;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer};

    const PREFIX: &str = "AWSOrganizationsV20161128";

    async fn mount_children(server: &MockServer, parent: &str, children: &[&str]) {
        let units: Vec<_> = children.iter().map(|id| json!({ "Id": id })).collect();
        Mock::given(method("POST"))
            .and(target(&format!("{PREFIX}.ListOrganizationalUnitsForParent")))
            .and(body_partial_json(json!({ "ParentId": parent })))
            .respond_with(aws_json(200, json!({ "OrganizationalUnits": units })))
            .mount(server)
            .await;
    }

    async fn mount_tags(server: &MockServer, resource: &str, tags: serde_json::Value) {
        Mock::given(method("POST"))
            .and(target(&format!("{PREFIX}.ListTagsForResource")))
            .and(body_partial_json(json!({ "ResourceId": resource })))
            .respond_with(aws_json(200, json!({ "Tags": tags })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_accounts_follows_next_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(target(&format!("{PREFIX}.ListAccounts")))
            .and(body_partial_json(json!({ "NextToken": "page-2" })))
            .respond_with(aws_json(200, json!({ "Accounts": [{ "Id": "333" }] })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(target(&format!("{PREFIX}.ListAccounts")))
            .respond_with(aws_json(
                200,
                json!({ "Accounts": [{ "Id": "111" }, { "Id": "222" }], "NextToken": "page-2" }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let source = OrganizationsHierarchySource::new(&sdk_config(&server.uri()));
        let accounts = source.list_accounts().await.unwrap();

        assert_eq!(accounts, vec!["111", "222", "333"]);
    }

    #[tokio::test]
    async fn test_snapshot_from_organizations_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(target(&format!("{PREFIX}.ListRoots")))
            .respond_with(aws_json(200, json!({ "Roots": [{ "Id": "r-root" }] })))
            .mount(&server)
            .await;
        mount_children(&server, "r-root", &["ou-eng"]).await;
        mount_children(&server, "ou-eng", &["ou-platform"]).await;
        mount_children(&server, "ou-platform", &[]).await;
        Mock::given(method("POST"))
            .and(target(&format!("{PREFIX}.ListAccounts")))
            .respond_with(aws_json(
                200,
                json!({ "Accounts": [{ "Id": "111" }, { "Id": "222" }] }),
            ))
            .mount(&server)
            .await;
        mount_tags(
            &server,
            "111",
            json!([
                { "Key": "CostCenter", "Value": "Eng" },
                { "Key": "Owner", "Value": "alice" }
            ]),
        )
        .await;
        mount_tags(&server, "222", json!([])).await;

        let source = OrganizationsHierarchySource::new(&sdk_config(&server.uri()));
        let snapshot = collect_snapshot(&source, &["CostCenter".to_string()])
            .await
            .unwrap();

        let units: Vec<_> = snapshot.units.sorted_ids().collect();
        assert_eq!(units, vec!["ou-eng", "ou-platform"]);
        assert_eq!(snapshot.accounts.len(), 1);
        assert_eq!(
            snapshot.accounts.get("111").unwrap(),
            &[TagAssignment::new("CostCenter", "Eng")]
        );
    }

    #[tokio::test]
    async fn test_api_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(target(&format!("{PREFIX}.ListRoots")))
            .respond_with(aws_json(
                400,
                json!({ "__type": "AccessDeniedException", "Message": "denied" }),
            ))
            .mount(&server)
            .await;

        let source = OrganizationsHierarchySource::new(&sdk_config(&server.uri()));
        let result = source.list_roots().await;

        assert!(matches!(result, Err(HierarchyError::Api(_))));
    }
}
