use anyhow::Context;

use authgate_api::config::AuthServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    authgate_observability::init();

    let config = AuthServiceConfig::from_env().context("invalid configuration")?;
    let app = authgate_api::app::build_app(&config);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
