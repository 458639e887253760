use std::sync::Arc;

use anyhow::Context;

use gatehouse_api::app::{build_app, build_services};
use gatehouse_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatehouse_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = build_services(&config).context("startup aborted")?;
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
