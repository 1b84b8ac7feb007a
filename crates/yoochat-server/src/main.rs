mod config;

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use yoochat_api::{AppState, AppStateInner};
use yoochat_crypto::build_cipher;
use yoochat_db::Database;
use yoochat_gateway::Dispatcher;
use yoochat_social::Social;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yoochat=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;
    info!("Database ready at {}", config.db_path.display());

    // A key the cipher cannot use stops startup here
    let cipher = build_cipher(config.cipher, &config.cipher_key).context("YOOCHAT_CIPHER_KEY")?;
    info!("Message cipher: {:?}", config.cipher);

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("creating upload dir {}", config.upload_dir.display()))?;

    let social = Arc::new(Social::new(
        Arc::new(db),
        cipher,
        config.search_mode,
        config.jwt_secret.clone(),
    ));

    let state: AppState = Arc::new(AppStateInner {
        social,
        dispatcher: Dispatcher::new(),
        upload_dir: config.upload_dir.clone(),
    });

    let app = yoochat_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("YooChat server listening on {} (search: {:?})", addr, config.search_mode);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
