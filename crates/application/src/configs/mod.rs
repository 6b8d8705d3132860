pub mod diff;
pub mod service;

pub use diff::{ResourcePlanItem, ResourceUpdate, SyncPlan, plan, sync};
pub use service::ConfigSyncService;
