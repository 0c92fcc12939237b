//! Catalog module.
//!
//! Service catalog, package descriptor and failure cache, with their JSON
//! file storage.

mod cache;
mod models;
mod store;

pub use cache::*;
pub use models::*;
pub use store::*;
