//! Sync use case - orchestrates collection, change detection and publishing

use std::sync::Arc;

use crate::{
    model::{
        CostCategoryDefinition, DigestKeys, DigestPair, EffectiveStart, OrgSnapshot,
        OwnershipMarker, SyncOutcome,
    },
    ports::{CostCategoryApi, DigestStore, HierarchySource},
    usecases::{
        collect::collect_snapshot,
        detect::{ChangeReport, detect_changes},
        publish::publish_definitions,
        rules::build_definitions,
    },
};

/// Configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Account tag keys turned into cost categories
    pub allowed_tag_keys: Vec<String>,
    /// Month from which published rules apply
    pub effective_start: EffectiveStart,
    /// Tag marking definitions managed by this tool
    pub marker: OwnershipMarker,
    /// Where the two digests are persisted
    pub digest_keys: DigestKeys,
    /// Build and log, but never write
    pub dry_run: bool,
}

/// Definitions and fresh digests derived from one snapshot
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub definitions: Vec<CostCategoryDefinition>,
    pub digests: DigestPair,
}

/// Derive the definitions and digests for a snapshot without touching storage
pub fn plan(snapshot: &OrgSnapshot) -> SyncPlan {
    let digests = detect_changes(snapshot, &DigestPair::never_written()).digests();
    SyncPlan {
        definitions: build_definitions(&snapshot.accounts),
        digests,
    }
}

/// Sync orchestrator
#[derive(Clone)]
pub struct SyncRun<H, D, A>
where
    H: HierarchySource + ?Sized,
    D: DigestStore + ?Sized,
    A: CostCategoryApi + ?Sized,
{
    hierarchy: Arc<H>,
    digest_store: Arc<D>,
    api: Arc<A>,
    config: SyncConfig,
}

impl<H, D, A> SyncRun<H, D, A>
where
    H: HierarchySource + ?Sized,
    D: DigestStore + ?Sized,
    A: CostCategoryApi + ?Sized,
{
    pub fn new(hierarchy: Arc<H>, digest_store: Arc<D>, api: Arc<A>, config: SyncConfig) -> Self {
        Self {
            hierarchy,
            digest_store,
            api,
            config,
        }
    }

    /// Run a single reconciliation
    pub async fn run_once(&self) -> Result<SyncOutcome, SyncError> {
        let snapshot = collect_snapshot(self.hierarchy.as_ref(), &self.config.allowed_tag_keys)
            .await
            .map_err(|e| SyncError::Hierarchy(e.to_string()))?;

        tracing::info!(
            tagged_accounts = snapshot.accounts.len(),
            units = snapshot.units.len(),
            "Collected organization snapshot"
        );

        let stored = self.read_digests().await?;
        let report = detect_changes(&snapshot, &stored);

        if report.is_up_to_date() {
            tracing::info!("Nothing to do, no change detected on organization accounts and units");
            return Ok(SyncOutcome::UpToDate {
                digests: report.digests(),
            });
        }

        tracing::info!(
            accounts_changed = report.accounts_changed,
            units_changed = report.units_changed,
            "Organization changed, rebuilding cost categories"
        );

        let definitions = build_definitions(&snapshot.accounts);

        if self.config.dry_run {
            for definition in &definitions {
                tracing::info!(
                    category = %definition.name,
                    rules = definition.rules.len(),
                    "[DRY RUN] Would publish cost category"
                );
            }
            return Ok(SyncOutcome::Planned {
                definitions,
                digests: report.digests(),
            });
        }

        let index = self
            .api
            .list_owned_definitions(&self.config.marker)
            .await
            .map_err(|e| SyncError::Publish(e.to_string()))?;

        tracing::debug!(owned = index.len(), "Listed managed cost categories");

        let published = publish_definitions(
            self.api.as_ref(),
            &definitions,
            &index,
            self.config.effective_start,
            &self.config.marker,
        )
        .await
        .map_err(|e| SyncError::Publish(e.to_string()))?;

        self.write_digests(&report).await?;

        tracing::info!(
            created = published.created.len(),
            updated = published.updated.len(),
            "Cost categories published"
        );

        Ok(SyncOutcome::Published {
            report: published,
            digests: report.digests(),
        })
    }

    async fn read_digests(&self) -> Result<DigestPair, SyncError> {
        let keys = &self.config.digest_keys;
        let accounts = self
            .digest_store
            .get_digest(&keys.accounts)
            .await
            .map_err(|e| SyncError::DigestStore(e.to_string()))?;
        let units = self
            .digest_store
            .get_digest(&keys.units)
            .await
            .map_err(|e| SyncError::DigestStore(e.to_string()))?;

        Ok(DigestPair { accounts, units })
    }

    async fn write_digests(&self, report: &ChangeReport) -> Result<(), SyncError> {
        let keys = &self.config.digest_keys;
        self.digest_store
            .put_digest(&keys.accounts, report.accounts_digest.as_str())
            .await
            .map_err(|e| SyncError::DigestStore(e.to_string()))?;
        self.digest_store
            .put_digest(&keys.units, report.units_digest.as_str())
            .await
            .map_err(|e| SyncError::DigestStore(e.to_string()))?;

        Ok(())
    }
}

/// Errors from a sync run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Hierarchy error: {0}")]
    Hierarchy(String),
    #[error("Digest store error: {0}")]
    DigestStore(String),
    #[error("Publish error: {0}")]
    Publish(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DIGEST_SENTINEL, RemoteDefinitionIndex};
    use crate::ports::DigestStoreError;
    use crate::usecases::collect::tests::FakeHierarchy;
    use crate::usecases::publish::tests::{Call, RecordingApi};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDigestStore {
        values: Mutex<HashMap<String, String>>,
        broken: bool,
        writes: Mutex<usize>,
    }

    #[async_trait]
    impl DigestStore for FakeDigestStore {
        async fn get_digest(&self, key: &str) -> Result<String, DigestStoreError> {
            if self.broken {
                return Err(DigestStoreError::Storage("access denied".to_string()));
            }
            Ok(self
                .values
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_else(|| DIGEST_SENTINEL.to_string()))
        }

        async fn put_digest(&self, key: &str, value: &str) -> Result<(), DigestStoreError> {
            *self.writes.lock().unwrap() += 1;
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    fn config(dry_run: bool) -> SyncConfig {
        SyncConfig {
            allowed_tag_keys: vec!["CostCenter".to_string()],
            effective_start: EffectiveStart::new(2024, 1).unwrap(),
            marker: OwnershipMarker::default(),
            digest_keys: DigestKeys {
                accounts: "/test/accounts".to_string(),
                units: "/test/units".to_string(),
            },
            dry_run,
        }
    }

    fn org() -> FakeHierarchy {
        FakeHierarchy::with_root("r-1")
            .child("r-1", "ou-a")
            .account("A1", &[("CostCenter", "Eng")])
            .account("A2", &[("CostCenter", "Eng")])
            .account("A3", &[("CostCenter", "Sales")])
    }

    fn sync(
        hierarchy: FakeHierarchy,
        store: &Arc<FakeDigestStore>,
        api: &Arc<RecordingApi>,
        dry_run: bool,
    ) -> SyncRun<FakeHierarchy, FakeDigestStore, RecordingApi> {
        SyncRun::new(
            Arc::new(hierarchy),
            Arc::clone(store),
            Arc::clone(api),
            config(dry_run),
        )
    }

    #[tokio::test]
    async fn test_first_run_publishes_and_persists_digests() {
        let store = Arc::new(FakeDigestStore::default());
        let api = Arc::new(RecordingApi::default());

        let outcome = sync(org(), &store, &api, false).run_once().await.unwrap();

        let SyncOutcome::Published { report, digests } = outcome else {
            panic!("expected publish");
        };
        assert_eq!(report.created, vec!["CostCenter"]);
        assert_eq!(api.calls().len(), 1);

        let values = store.values.lock().unwrap();
        assert_eq!(values.get("/test/accounts"), Some(&digests.accounts));
        assert_eq!(values.get("/test/units"), Some(&digests.units));
    }

    #[tokio::test]
    async fn test_second_run_is_up_to_date_and_writes_nothing() {
        let store = Arc::new(FakeDigestStore::default());
        let api = Arc::new(RecordingApi::default());

        sync(org(), &store, &api, false).run_once().await.unwrap();
        let outcome = sync(org(), &store, &api, false).run_once().await.unwrap();

        assert!(matches!(outcome, SyncOutcome::UpToDate { .. }));
        assert_eq!(api.calls().len(), 1);
        assert_eq!(*store.writes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_owned_definition_is_updated() {
        let store = Arc::new(FakeDigestStore::default());
        let api = Arc::new(RecordingApi {
            owned: [("CostCenter", "arn:cc")]
                .into_iter()
                .collect::<RemoteDefinitionIndex>(),
            ..Default::default()
        });

        sync(org(), &store, &api, false).run_once().await.unwrap();

        assert_eq!(
            api.calls(),
            vec![Call::Update {
                remote_id: "arn:cc".to_string(),
                name: "CostCenter".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_new_unit_triggers_rebuild() {
        let store = Arc::new(FakeDigestStore::default());
        let api = Arc::new(RecordingApi::default());

        sync(org(), &store, &api, false).run_once().await.unwrap();
        let grown = org().child("ou-a", "ou-b");
        let outcome = sync(grown, &store, &api, false).run_once().await.unwrap();

        assert!(matches!(outcome, SyncOutcome::Published { .. }));
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_org_writes_once_then_settles() {
        let store = Arc::new(FakeDigestStore::default());
        let api = Arc::new(RecordingApi::default());
        let empty = || FakeHierarchy::with_root("r-1");

        let first = sync(empty(), &store, &api, false).run_once().await.unwrap();
        let second = sync(empty(), &store, &api, false).run_once().await.unwrap();

        match first {
            SyncOutcome::Published { report, .. } => {
                assert!(report.created.is_empty());
                assert!(report.updated.is_empty());
            }
            other => panic!("expected publish, got {other:?}"),
        }
        assert!(matches!(second, SyncOutcome::UpToDate { .. }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let store = Arc::new(FakeDigestStore::default());
        let api = Arc::new(RecordingApi::default());

        let outcome = sync(org(), &store, &api, true).run_once().await.unwrap();

        match outcome {
            SyncOutcome::Planned { definitions, .. } => assert_eq!(definitions.len(), 1),
            other => panic!("expected plan, got {other:?}"),
        }
        assert!(api.calls().is_empty());
        assert_eq!(*store.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_digests_unwritten() {
        let store = Arc::new(FakeDigestStore::default());
        let api = Arc::new(RecordingApi {
            fail_on: Some("CostCenter".to_string()),
            ..Default::default()
        });

        let result = sync(org(), &store, &api, false).run_once().await;

        assert!(matches!(result, Err(SyncError::Publish(_))));
        assert_eq!(*store.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_digest_read_error_aborts_before_publishing() {
        let store = Arc::new(FakeDigestStore {
            broken: true,
            ..Default::default()
        });
        let api = Arc::new(RecordingApi::default());

        let result = sync(org(), &store, &api, false).run_once().await;

        assert!(matches!(result, Err(SyncError::DigestStore(_))));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_plan_matches_rule_builder() {
        let snapshot = OrgSnapshot {
            accounts: [("A1", vec![crate::TagAssignment::new("CostCenter", "Eng")])]
                .into_iter()
                .collect(),
            units: ["ou-a"].into_iter().collect(),
        };

        let plan = plan(&snapshot);

        assert_eq!(plan.definitions, build_definitions(&snapshot.accounts));
        assert_eq!(plan.digests.accounts, snapshot.accounts.fingerprint().to_string());
        assert_eq!(plan.digests.units, snapshot.units.fingerprint().to_string());
    }
}
