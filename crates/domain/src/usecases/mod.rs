//! Application use cases / business logic

pub mod collect;
pub mod detect;
pub mod lifecycle;
pub mod publish;
pub mod rules;
pub mod sync;

pub use collect::{collect_account_tags, collect_snapshot, collect_units};
pub use detect::{ChangeReport, detect_changes};
pub use lifecycle::{LifecycleDecision, acknowledge};
pub use publish::{PublishAction, plan_action, publish_definitions};
pub use rules::build_definitions;
pub use sync::{SyncConfig, SyncError, SyncPlan, SyncRun, plan};
