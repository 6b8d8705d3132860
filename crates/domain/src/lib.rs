// Flashplane - Domain Layer
// Bounded Contexts:
// - shared_kernel: errores y tipos compartidos
// - manifests: documentos declarativos, esquemas parciales tipados y validación
// - resources / config_commits: configuración versionada y sus recursos
// - jobs: registro de envíos al scheduler
// - tenancy / storage: proyectos, membresías y volúmenes por tenant
// - cluster: puertos hacia Kubernetes y el scheduler batch

pub mod audit;
pub mod cluster;
pub mod config_commits;
pub mod jobs;
pub mod manifests;
pub mod naming;
pub mod request_context;
pub mod resources;
pub mod shared_kernel;
pub mod storage;
pub mod tenancy;

pub use audit::*;
pub use cluster::*;
pub use config_commits::*;
pub use jobs::*;
pub use manifests::*;
pub use naming::*;
pub use request_context::*;
pub use resources::*;
pub use shared_kernel::*;
pub use storage::*;
pub use tenancy::*;
