use std::sync::Arc;

use anyhow::Context;

use datagate_api::app::{build_app, AppServices};
use datagate_api::config::ServiceConfig;
use datagate_auth::PermitAll;
use datagate_infra::{InMemoryEntityStore, Seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    datagate_observability::init();

    let config = ServiceConfig::from_env().context("invalid configuration")?;
    tracing::info!(auth = ?config.auth, bind_addr = %config.bind_addr, "configuration loaded");

    let store = Arc::new(InMemoryEntityStore::new());
    if let Some(path) = &config.seed_file {
        Seed::from_path(path)
            .and_then(|seed| seed.apply(&store))
            .with_context(|| format!("cannot seed entity store from {}", path.display()))?;
    }

    let services = AppServices::new(&config.auth, store, Arc::new(PermitAll));
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
