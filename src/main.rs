//! LegalFooter policy webhook service.
//!
//! Main entry point. Loads configuration, connects to the database, builds
//! the email client and signature verifier, then serves until SIGINT or
//! SIGTERM.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use legalfooter_api::{AppState, Config, EventProcessor, SignatureVerifier};
use legalfooter_core::{
    storage::{run_migrations, Storage},
    Clock, RealClock,
};
use legalfooter_mail::ResendClient;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log);

    info!("Starting LegalFooter webhook service");
    info!(
        database_url = %config.database_url_masked(),
        max_connections = config.database_max_connections,
        resend_api_url = %config.resend_api_url,
        signature_tolerance_seconds = config.signature_tolerance_seconds,
        "Configuration loaded"
    );

    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    run_migrations(&db_pool).await.context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let clock: Arc<dyn Clock> = Arc::new(RealClock::new());
    let mailer =
        ResendClient::new(config.to_client_config()).context("Failed to build email client")?;
    let verifier =
        SignatureVerifier::new(config.stripe_webhook_secret.expose(), Arc::clone(&clock))
            .context("Invalid webhook signing secret")?
            .with_tolerance(config.signature_tolerance());

    let processor = EventProcessor::new(Arc::new(Storage::new(db_pool.clone())), Arc::new(mailer))
        .with_sender(config.email_from.clone());

    let state = AppState::new(processor, verifier, clock)
        .with_verification_errors_exposed(config.expose_verification_errors)
        .with_request_timeout(config.request_timeout());

    let addr = config.parse_server_addr()?;
    info!(%addr, "LegalFooter is ready to receive webhooks");

    legalfooter_api::start_server(state, addr).await.context("HTTP server failed")?;

    db_pool.close().await;
    info!("Database connections closed");

    info!("LegalFooter shutdown complete");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` in the environment wins over the
/// configured filter.
fn init_tracing(configured_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    let options = config.connect_options()?;
    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .connect_with(options.clone())
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
