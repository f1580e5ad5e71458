pub mod config;
pub mod error;
pub mod factory;
pub mod providers;
pub mod registry;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::ProviderError;
pub use factory::*;
pub use registry::*;
pub use traits::*;
pub use types::*;
