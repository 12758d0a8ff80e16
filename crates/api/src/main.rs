use anyhow::Context;

use storefront_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = storefront_api::app::services::build_store(&config.store).await?;
    let app = storefront_api::app::build_app(store);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
