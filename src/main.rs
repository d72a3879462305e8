use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticketgate_server::config::Config;
use ticketgate_server::db;
use ticketgate_server::routes::create_routes;
use ticketgate_server::services::{BrevoMailer, LogMailer, Mailer};
use ticketgate_server::state::AppState;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=info,sqlx=warn";
/// How long pending ticket emails may take to flush on shutdown.
const DELIVERY_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Arc::new(Config::from_env().context("Invalid configuration")?);
    if config.paystack_secret_key.is_none() {
        tracing::warn!("PAYSTACK_SECRET_KEY is not set, every webhook will be rejected");
    }

    let pool = db::connect(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Successfully connected to database");

    db::migrate(&pool).await.context("Failed to run migrations")?;
    tracing::info!("Migrations run successfully");

    tokio::fs::create_dir_all(&config.qr_code_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.qr_code_dir.display()))?;

    let mailer: Arc<dyn Mailer> = match &config.mail.brevo_api_key {
        Some(api_key) => Arc::new(
            BrevoMailer::new(api_key.clone()).context("Failed to build email client")?,
        ),
        None => {
            tracing::warn!("BREVO_API_KEY is not set, ticket emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let (state, delivery_worker) =
        AppState::new(config.clone(), pool, mailer).context("Failed to load templates")?;
    let app = create_routes(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind address")?;
    tracing::info!("🚀 Server running at http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    if tokio::time::timeout(DELIVERY_DRAIN_TIMEOUT, delivery_worker)
        .await
        .is_err()
    {
        tracing::warn!("Shutting down with ticket emails still queued");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
