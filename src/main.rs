//! ZM Storefront - wholesale hardware storefront service

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zm_storefront::{advisor::TechAdvisor, api, Catalog};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let catalog = Arc::new(Catalog::builtin());
    tracing::info!(products = catalog.len(), specs = catalog.all_specs().len(), "catalog loaded");
    let idle_secs = std::env::var("SESSION_IDLE_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(api::DEFAULT_SESSION_IDLE_SECS);
    let state = api::AppState::new(catalog, TechAdvisor::from_env()).with_idle_timeout(Duration::from_secs(idle_secs));
    api::spawn_session_sweeper(state.clone());
    let app = api::router(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("ZM Storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
