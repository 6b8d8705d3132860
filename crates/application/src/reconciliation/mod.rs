pub mod backoff;
pub mod reconciler;

pub use backoff::ReconcileBackoff;
pub use reconciler::ReconciliationLoop;
