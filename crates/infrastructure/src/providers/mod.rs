//! Adaptadores hacia Kubernetes y el scheduler batch

pub mod flash_job;
pub mod kubernetes;

pub use flash_job::KubeWorkloadClient;
pub use kubernetes::{KubeClusterClient, create_client};
