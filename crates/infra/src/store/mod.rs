//! Catalog persistence boundary.
//!
//! `CatalogStore` is the storage-agnostic interface the HTTP layer talks to.
//! `InMemoryCatalogStore` backs dev/test runs, `PostgresCatalogStore` backs
//! persistent deployments.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use r#trait::{CatalogStore, StoreError, StoreResult};
