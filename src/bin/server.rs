use portfolio_service::{
    api::{create_app, AppState},
    cache::{Cache, DEFAULT_OPERATION_TIMEOUT},
    logging,
    render::Renderer,
    Config, PortfolioService,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    config.validate()?;
    logging::init(&config.log_level)?;

    let cache = match &config.redis_url {
        Some(url) => Cache::connect(url, DEFAULT_OPERATION_TIMEOUT).await,
        None => {
            info!("REDIS_URL not set, running without cache");
            Cache::disabled()
        }
    };

    let service = PortfolioService::from_config(&config, cache.clone())?;
    let state = AppState::new(service, Renderer::new()?, cache.clone(), config.version.clone());

    info!("Portfolio server starting (version {})", config.version);
    info!("Configuration file: {}", config.config_file_path.display());
    info!("Static assets: {}", config.static_dir.display());
    if config.environment.is_development() {
        info!("Development mode enabled");
    }

    let app = create_app(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
