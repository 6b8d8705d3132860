// Flashplane - Infrastructure Layer
// Implementaciones concretas de los puertos del dominio
// Módulos:
// - crd: recurso FlashJob del scheduler batch
// - providers: clientes de Kubernetes (namespaces, PVCs, objetos, FlashJobs)
// - persistence: repositorios PostgreSQL y en memoria

pub mod crd;
pub mod persistence;
pub mod providers;

pub use crd::*;
pub use providers::*;
