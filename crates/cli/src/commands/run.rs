//! Run command - acknowledge a lifecycle event, then reconcile once

use anyhow::{Context, Result};
use costcat_sync_adapters::{
    aws::{CostExplorerApi, load_sdk_config},
    hierarchy::OrganizationsHierarchySource,
    lifecycle::CloudFormationNotifier,
    state::{SqliteDigestStore, SsmDigestStore},
};
use costcat_sync_domain::{
    DigestStore, LifecycleEvent, SyncOutcome,
    usecases::{LifecycleDecision, SyncRun, acknowledge},
};
use std::path::Path;
use std::sync::Arc;

use crate::args::RunArgs;
use crate::config::{AppConfig, DigestBackend};

pub async fn execute(args: RunArgs, config: AppConfig) -> Result<()> {
    let sync_config = config.to_sync_config(args.dry_run)?;

    tracing::info!(
        dry_run = sync_config.dry_run,
        tags = ?sync_config.allowed_tag_keys,
        effective_start = %sync_config.effective_start,
        backend = ?config.digests.backend,
        "Starting costcat-sync run"
    );

    if let Some(event_path) = &args.event {
        let event = load_event(event_path)?;
        let notifier = CloudFormationNotifier::new(&args.log_stream_name)
            .context("Failed to initialize lifecycle notifier")?;

        let decision = acknowledge(&notifier, &event)
            .await
            .context("Failed to acknowledge lifecycle event")?;
        if decision == LifecycleDecision::Skip {
            tracing::info!("Delete request acknowledged, nothing to reconcile");
            return Ok(());
        }
    }

    let sdk_config = load_sdk_config(&config.aws_settings()).await;

    let digest_store: Arc<dyn DigestStore> = match config.digests.backend {
        DigestBackend::Ssm => Arc::new(SsmDigestStore::new(&sdk_config)),
        DigestBackend::Sqlite => Arc::new(
            SqliteDigestStore::new(&config.digests.sqlite_path)
                .await
                .context("Failed to initialize SQLite digest store")?,
        ),
    };
    let hierarchy = Arc::new(OrganizationsHierarchySource::new(&sdk_config));
    let api = Arc::new(CostExplorerApi::new(&sdk_config));

    let sync = SyncRun::new(hierarchy, digest_store, api, sync_config);
    let outcome = sync.run_once().await.context("Sync run failed")?;

    match &outcome {
        SyncOutcome::UpToDate { digests } => {
            tracing::info!(
                accounts_digest = %digests.accounts,
                units_digest = %digests.units,
                "Cost categories already up to date"
            );
        }
        SyncOutcome::Planned {
            definitions,
            digests,
        } => {
            tracing::info!(
                categories = definitions.len(),
                accounts_digest = %digests.accounts,
                units_digest = %digests.units,
                "Dry run complete, nothing published"
            );
        }
        SyncOutcome::Published { report, digests } => {
            tracing::info!(
                created = ?report.created,
                updated = ?report.updated,
                accounts_digest = %digests.accounts,
                units_digest = %digests.units,
                "Cost categories published"
            );
        }
    }

    tracing::info!("costcat-sync run completed");
    Ok(())
}

fn load_event(path: &Path) -> Result<LifecycleEvent> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path.display()))?;
    let event: LifecycleEvent = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event file: {}", path.display()))?;
    tracing::debug!(event = ?event, "Loaded lifecycle event");
    Ok(event)
}
