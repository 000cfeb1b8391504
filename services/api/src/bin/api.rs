//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HmacUploadSigner, SmtpMailAdapter, TwilioSmsAdapter},
    config::Config,
    error::ApiError,
    jobs::ReleaseScheduler,
    web::{self, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();
    let sms = Arc::new(TwilioSmsAdapter::new(http_client, config.twilio.clone()));
    let mailer = Arc::new(SmtpMailAdapter::new(config.email.clone())?);
    let uploads = Arc::new(HmacUploadSigner::from_optional_key(
        config.upload_base_url.clone(),
        config.upload_signing_key.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        sms,
        mailer,
        uploads,
    });

    // --- 5. Start the Release Job ---
    let shutdown = CancellationToken::new();
    let scheduler = Arc::new(ReleaseScheduler::new(
        app_state.clone(),
        config.release_check_interval,
        shutdown.clone(),
    ));
    let release_job = scheduler.start();

    // --- 6. Create the Web Router ---
    let app = web::router(app_state)?;

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    release_job
        .await
        .map_err(|e| ApiError::Internal(format!("Release job panicked: {}", e)))?;
    info!("Shutdown complete.");
    Ok(())
}

/// Resolves on Ctrl-C and cancels the background job.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
