//! Plan command - show what a sync would publish, without writing anything

use anyhow::{Context, Result};
use costcat_sync_adapters::{
    aws::load_sdk_config,
    hierarchy::{FsHierarchySource, OrganizationsHierarchySource},
};
use costcat_sync_domain::{
    HierarchySource,
    usecases::{SyncPlan, collect_snapshot, plan},
};
use serde_json::json;

use crate::args::PlanArgs;
use crate::config::AppConfig;

pub async fn execute(args: PlanArgs, config: AppConfig) -> Result<()> {
    let allowed_keys = config.categories.tags.keys();

    let source: Box<dyn HierarchySource> = match &args.snapshot {
        Some(path) => Box::new(
            FsHierarchySource::load(path).context("Failed to load organization snapshot")?,
        ),
        None => {
            let sdk_config = load_sdk_config(&config.aws_settings()).await;
            Box::new(OrganizationsHierarchySource::new(&sdk_config))
        }
    };

    let snapshot = collect_snapshot(source.as_ref(), &allowed_keys)
        .await
        .context("Failed to collect organization")?;
    let sync_plan = plan(&snapshot);

    if args.json {
        print_json(&sync_plan)?;
    } else {
        print_text(&sync_plan);
    }

    Ok(())
}

fn print_json(sync_plan: &SyncPlan) -> Result<()> {
    let definitions: Vec<_> = sync_plan
        .definitions
        .iter()
        .map(|definition| {
            json!({
                "name": definition.name,
                "rules": definition.rules_json(),
            })
        })
        .collect();

    let output = json!({
        "digests": {
            "accounts": sync_plan.digests.accounts,
            "units": sync_plan.digests.units,
        },
        "definitions": definitions,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text(sync_plan: &SyncPlan) {
    println!("Accounts digest: {}", sync_plan.digests.accounts);
    println!("Units digest:    {}", sync_plan.digests.units);
    println!();

    if sync_plan.definitions.is_empty() {
        println!("No cost categories (no account carries a configured tag)");
        return;
    }

    println!("Cost categories ({}):", sync_plan.definitions.len());
    for definition in &sync_plan.definitions {
        println!("  {}", definition.name);
        for rule in &definition.rules {
            println!("    {} -> {}", rule.value, rule.accounts.join(", "));
        }
    }
}
