//! # Quillpress Server
//!
//! Assembles the application: configuration, tracing, the content store
//! selected at compile time, and the axum router.

use std::sync::Arc;

use anyhow::Context;
use configs::AppConfig;
use domains::ContentStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config);

    let store = build_store(&config).await?;
    let state = api_adapters::AppState::new(store);
    let app = api_adapters::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "quillpress listening");
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.log.filter);
    let registry = tracing_subscriber::registry().with(filter);
    if config.log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(feature = "db-postgres")]
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ContentStore>> {
    use secrecy::ExposeSecret;

    let store = storage_adapters::PgContentStore::connect(
        config.database.url.expose_secret(),
        config.database.max_connections,
    )
    .await
    .context("connecting to postgres")?;
    store.init_schema().await.context("initializing schema")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "db-postgres"))]
async fn build_store(_config: &AppConfig) -> anyhow::Result<Arc<dyn ContentStore>> {
    tracing::warn!("built without db-postgres; content lives in memory only");
    Ok(Arc::new(storage_adapters::MemoryStore::new()))
}
