//! Hierarchy collection - turns the organization tree into a snapshot

use crate::{
    model::{AccountTagMap, OrgSnapshot, UnitIdSet},
    ports::{HierarchyError, HierarchySource},
};

/// Collect every unit under the first organization root.
///
/// Uses an explicit stack so deep hierarchies do not grow the call stack.
pub async fn collect_units<H>(source: &H) -> Result<UnitIdSet, HierarchyError>
where
    H: HierarchySource + ?Sized,
{
    let roots = source.list_roots().await?;
    let Some(root) = roots.into_iter().next() else {
        return Err(HierarchyError::NoRoot);
    };

    let mut units = UnitIdSet::new();
    let mut pending = vec![root];

    while let Some(parent) = pending.pop() {
        for child in source.list_child_units(&parent).await? {
            // A unit seen twice would otherwise be walked twice
            if units.insert(child.clone()) {
                pending.push(child);
            }
        }
    }

    tracing::debug!(units = units.len(), "Collected organizational units");
    Ok(units)
}

/// Collect allowed tags for every account, in enumeration order
pub async fn collect_account_tags<H>(
    source: &H,
    allowed_keys: &[String],
) -> Result<AccountTagMap, HierarchyError>
where
    H: HierarchySource + ?Sized,
{
    let accounts = source.list_accounts().await?;
    let mut map = AccountTagMap::new();

    for account_id in accounts {
        let tags = source.tags_for(&account_id).await?;
        let allowed = tags
            .into_iter()
            .filter(|tag| allowed_keys.iter().any(|key| *key == tag.key));
        map.extend_account(account_id, allowed);
    }

    tracing::debug!(tagged_accounts = map.len(), "Collected account tags");
    Ok(map)
}

/// Collect units and account tags together
pub async fn collect_snapshot<H>(
    source: &H,
    allowed_keys: &[String],
) -> Result<OrgSnapshot, HierarchyError>
where
    H: HierarchySource + ?Sized,
{
    let (units, accounts) = futures::try_join!(
        collect_units(source),
        collect_account_tags(source, allowed_keys)
    )?;

    Ok(OrgSnapshot { accounts, units })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::TagAssignment;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// In-memory organization tree
    #[derive(Default)]
    pub(crate) struct FakeHierarchy {
        pub roots: Vec<String>,
        pub children: HashMap<String, Vec<String>>,
        pub accounts: Vec<String>,
        pub tags: HashMap<String, Vec<TagAssignment>>,
    }

    impl FakeHierarchy {
        pub fn with_root(root: &str) -> Self {
            Self {
                roots: vec![root.to_string()],
                ..Default::default()
            }
        }

        pub fn child(mut self, parent: &str, unit: &str) -> Self {
            self.children
                .entry(parent.to_string())
                .or_default()
                .push(unit.to_string());
            self
        }

        pub fn account(mut self, id: &str, tags: &[(&str, &str)]) -> Self {
            self.accounts.push(id.to_string());
            self.tags.insert(
                id.to_string(),
                tags.iter().map(|(k, v)| TagAssignment::new(*k, *v)).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl HierarchySource for FakeHierarchy {
        async fn list_roots(&self) -> Result<Vec<String>, HierarchyError> {
            Ok(self.roots.clone())
        }

        async fn list_child_units(&self, parent_id: &str) -> Result<Vec<String>, HierarchyError> {
            Ok(self.children.get(parent_id).cloned().unwrap_or_default())
        }

        async fn list_accounts(&self) -> Result<Vec<String>, HierarchyError> {
            Ok(self.accounts.clone())
        }

        async fn tags_for(&self, resource_id: &str) -> Result<Vec<TagAssignment>, HierarchyError> {
            Ok(self.tags.get(resource_id).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_collect_units_walks_nested_tree() {
        let source = FakeHierarchy::with_root("r-1")
            .child("r-1", "ou-a")
            .child("r-1", "ou-b")
            .child("ou-a", "ou-a1")
            .child("ou-a1", "ou-a1x");

        let units = collect_units(&source).await.unwrap();

        let ids: Vec<_> = units.sorted_ids().collect();
        assert_eq!(ids, vec!["ou-a", "ou-a1", "ou-a1x", "ou-b"]);
        assert!(!units.contains("r-1"));
    }

    #[tokio::test]
    async fn test_collect_units_handles_deep_chain() {
        let mut source = FakeHierarchy::with_root("r-1");
        let mut parent = "r-1".to_string();
        for depth in 0..5_000 {
            let unit = format!("ou-{depth}");
            source = source.child(&parent, &unit);
            parent = unit;
        }

        let units = collect_units(&source).await.unwrap();
        assert_eq!(units.len(), 5_000);
    }

    #[tokio::test]
    async fn test_collect_units_without_root_fails() {
        let source = FakeHierarchy::default();
        let result = collect_units(&source).await;
        assert!(matches!(result, Err(HierarchyError::NoRoot)));
    }

    #[tokio::test]
    async fn test_collect_account_tags_filters_keys() {
        let source = FakeHierarchy::with_root("r-1")
            .account("111", &[("CostCenter", "Eng"), ("Name", "dev")])
            .account("222", &[("Name", "untagged")])
            .account("333", &[("Team", "core"), ("CostCenter", "Sales")]);
        let allowed = vec!["CostCenter".to_string(), "Team".to_string()];

        let map = collect_account_tags(&source, &allowed).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get("111").unwrap(),
            &[TagAssignment::new("CostCenter", "Eng")]
        );
        assert!(map.get("222").is_none());
        assert_eq!(
            map.get("333").unwrap(),
            &[
                TagAssignment::new("Team", "core"),
                TagAssignment::new("CostCenter", "Sales")
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_snapshot_combines_both() {
        let source = FakeHierarchy::with_root("r-1")
            .child("r-1", "ou-a")
            .account("111", &[("CostCenter", "Eng")]);
        let allowed = vec!["CostCenter".to_string()];

        let snapshot = collect_snapshot(&source, &allowed).await.unwrap();

        assert_eq!(snapshot.units.len(), 1);
        assert_eq!(snapshot.accounts.len(), 1);
    }
}
