use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use dogear_api::config::Settings;
use dogear_api::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dogear=debug,dogear_api=debug,dogear_db=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let settings = Settings::from_env()?;
    if settings.uses_placeholder_secret() {
        warn!("DOGEAR_JWT_SECRET is unset or still a placeholder; set it before exposing this server.");
    }
    if settings.allow_open_registration {
        warn!("Open registration is enabled; invites are not required.");
    }

    // Init database
    let db = dogear_db::Database::open(&settings.db_path)?;

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    let state: AppState = Arc::new(AppStateInner::new(db, settings));
    let app = dogear_api::router(state);

    info!("Dog-Eared server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
