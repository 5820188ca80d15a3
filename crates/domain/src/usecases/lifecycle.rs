//! Provisioning lifecycle handling
//!
//! Create and Update requests are acknowledged as successful before any
//! reconciliation starts, and a later reconciliation failure is never
//! reported back through the notifier. Delete requests are acknowledged and
//! nothing else runs. Request types this tool does not know are treated
//! like a scheduled invocation: no acknowledgment, reconciliation proceeds.

use crate::{
    model::{LifecycleEvent, RequestType},
    ports::{LifecycleNotifier, NotifyError},
};

/// Whether reconciliation should run after the event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleDecision {
    Proceed,
    Skip,
}

/// Acknowledge a lifecycle event and decide whether to reconcile
pub async fn acknowledge<N>(
    notifier: &N,
    event: &LifecycleEvent,
) -> Result<LifecycleDecision, NotifyError>
where
    N: LifecycleNotifier + ?Sized,
{
    let decision = match event.request_type {
        Some(RequestType::Create | RequestType::Update) => LifecycleDecision::Proceed,
        Some(RequestType::Delete) => LifecycleDecision::Skip,
        Some(RequestType::Unknown) | None => {
            tracing::debug!("No known lifecycle request type, running as scheduled invocation");
            return Ok(LifecycleDecision::Proceed);
        }
    };

    notifier.send_success(event).await?;
    tracing::info!(request_type = ?event.request_type, "Acknowledged lifecycle request");

    Ok(decision)
}
