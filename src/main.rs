use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use hvacbook::config::AppConfig;
use hvacbook::db;
use hvacbook::handlers;
use hvacbook::services::scheduler::square::SquareClient;
use hvacbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.square_access_token.is_empty() {
        tracing::warn!("SQUARE_ACCESS_TOKEN is not set; scheduling calls will fail and clients fall back to demo mode");
    } else {
        tracing::info!("using Square {} environment", config.square_environment);
    }
    if config.moderation_api_key.is_empty() {
        tracing::warn!("MODERATION_API_KEY is not set; review moderation is disabled");
    }

    let scheduler = SquareClient::new(
        config.square_access_token.clone(),
        &config.square_environment,
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        scheduler: Box::new(scheduler),
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
