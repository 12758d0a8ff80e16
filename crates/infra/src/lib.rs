//! Infrastructure layer: configuration and catalog persistence.

pub mod config;
pub mod store;

mod integration_tests;

pub use config::{AppConfig, ConfigError, StoreConfig};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult};
