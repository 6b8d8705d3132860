// Flashplane - Application Layer
// Casos de uso: diff de manifiestos, binding de despliegues, envío al
// scheduler batch y reconciliación de estados

pub mod configs;
pub mod deployment;
pub mod executor;
pub mod reconciliation;

#[cfg(test)]
pub(crate) mod testing;

pub use configs::*;
pub use deployment::*;
pub use executor::*;
pub use reconciliation::*;
