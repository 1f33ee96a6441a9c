use anyhow::Result;
use qrdrop::config::Config;
use qrdrop::handlers::AppState;
use qrdrop::{routes, storage};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn setup(config: &Config) -> Result<AppState> {
    let store = storage::connect(&config.storage).await?;
    info!("storing files in {}", store.describe());
    AppState::new(store, config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let state = setup(&config).await?;
    let router = routes::router(state);

    let listener = TcpListener::bind(config.address).await?;
    info!("listening on {}", config.address);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
