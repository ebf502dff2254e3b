mod config;
mod service;

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_flow::{
    InMemorySessionStorage, OpenRouterClient, SessionStorage, SqliteInteractionRecorder,
    TripController,
};

use crate::config::{LogFormat, ServiceConfig};
use crate::service::{AppState, build_router};

/// Initialize tracing in the configured format
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "itinerary_service=debug,trip_flow=debug,tower_http=debug".into()
    });

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = ServiceConfig::from_env()?;
    init_tracing(config.log_format);

    info!(model = %config.llm_model, "Starting itinerary service");

    let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
    let recorder = Arc::new(
        SqliteInteractionRecorder::connect(&config.database_url)
            .await
            .context("failed to open interaction database")?,
    );
    let llm = Arc::new(OpenRouterClient::new(
        &config.openrouter_api_key,
        config.llm_model.clone(),
    ));

    let app_state = AppState {
        controller: TripController::new(session_storage, llm, recorder.clone()),
        recorder,
    };
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("Server running on http://{}", config.bind_addr);
    info!("Available endpoints:");
    info!("  GET    /health                 - Health check");
    info!("  POST   /api/create-itinerary   - Send a chat message");
    info!("  GET    /session/{{id}}           - Inspect a session");
    info!("  DELETE /session/{{id}}           - Start a new trip");
    info!("  GET    /api/interactions       - Recorded interactions");
    info!("  GET    /api/analytics/summary  - Booking statistics");

    axum::serve(listener, app).await?;

    Ok(())
}
