use anyhow::Context;

use seatwise_infra::config::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    seatwise_observability::init();

    let config = ServiceConfig::from_env();
    let bind_addr = config.bind_addr;

    let app = seatwise_api::app::build_app(config)
        .await
        .context("failed to build services")?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
