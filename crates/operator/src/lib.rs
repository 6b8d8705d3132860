//! Flashplane Operator
//!
//! Wires configuration, PostgreSQL and the Kubernetes client together and
//! runs the FlashJob reconciliation loop until shutdown.

pub mod logging;
pub mod startup;

pub use logging::{LogFormat, LogLevel, init_logging};
pub use startup::{Operator, StartupOptions};
