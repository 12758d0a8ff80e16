use std::sync::Arc;

use anyhow::Context;

use storefront_infra::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreConfig};

/// Store handle shared by every handler.
pub type SharedStore = Arc<dyn CatalogStore>;

/// Build the catalog store selected by configuration.
///
/// Postgres stores get their tables created on startup.
pub async fn build_store(config: &StoreConfig) -> anyhow::Result<SharedStore> {
    match config {
        StoreConfig::InMemory => {
            tracing::info!("using in-memory catalog store");
            Ok(Arc::new(InMemoryCatalogStore::new()))
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresCatalogStore::connect(database_url, *max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to create catalog schema")?;

            tracing::info!(max_connections = *max_connections, "using Postgres catalog store");
            Ok(Arc::new(store))
        }
    }
}
