pub mod config;
pub mod error;
pub mod ids;
pub mod states;

pub use error::*;
pub use ids::*;
pub use states::*;
