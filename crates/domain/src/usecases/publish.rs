//! Publishing - reconciles built definitions with the remote API

use crate::{
    model::{
        CostCategoryDefinition, EffectiveStart, OwnershipMarker, PublishReport,
        RemoteDefinitionIndex,
    },
    ports::{CostCategoryApi, CostCategoryError},
};

/// What publishing will do with a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction<'a> {
    /// Replace the rules of an owned definition
    Update { remote_id: &'a str },
    /// Create a new definition carrying the ownership marker
    Create,
}

/// Update iff the name is already owned, else create
pub fn plan_action<'a>(name: &str, index: &'a RemoteDefinitionIndex) -> PublishAction<'a> {
    match index.remote_id(name) {
        Some(remote_id) => PublishAction::Update { remote_id },
        None => PublishAction::Create,
    }
}

/// Push every definition to the remote API.
///
/// Each definition is sent whole; the first failure stops the run.
pub async fn publish_definitions<A>(
    api: &A,
    definitions: &[CostCategoryDefinition],
    index: &RemoteDefinitionIndex,
    effective_start: EffectiveStart,
    marker: &OwnershipMarker,
) -> Result<PublishReport, CostCategoryError>
where
    A: CostCategoryApi + ?Sized,
{
    let mut report = PublishReport::default();

    for definition in definitions {
        match plan_action(&definition.name, index) {
            PublishAction::Update { remote_id } => {
                tracing::info!(
                    category = %definition.name,
                    rules = definition.rules.len(),
                    "Cost category exists and is managed here, updating"
                );
                api.update_definition(remote_id, definition, effective_start)
                    .await?;
                report.updated.push(definition.name.clone());
            }
            PublishAction::Create => {
                tracing::info!(
                    category = %definition.name,
                    rules = definition.rules.len(),
                    "Cost category detected from tags, creating"
                );
                api.create_definition(definition, effective_start, marker)
                    .await?;
                report.created.push(definition.name.clone());
            }
        }
    }

    Ok(report)
}
