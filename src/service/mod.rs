//! Service layer module

pub mod tryon_service;
pub mod types;

pub use tryon_service::TryOnService;
pub use types::*;
