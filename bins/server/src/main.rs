//! Expensa API Server
//!
//! Main entry point for the expense approval service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expensa_api::{AppState, create_router};
use expensa_core::currency::{ExchangeRate, RateTableConverter};
use expensa_db::connect_with_pool;
use expensa_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expensa=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let rates: Vec<ExchangeRate> = config
        .currency
        .pairs()
        .map(|(from, to, rate)| ExchangeRate::new(&from, &to, rate))
        .collect();
    let converter = RateTableConverter::new(rates);
    if converter.is_empty() {
        warn!("No exchange rates configured, foreign-currency claims are stored unconverted");
    } else {
        info!(rates = converter.len(), "Exchange rates loaded");
    }

    let state = AppState {
        db: Arc::new(db),
        converter: Arc::new(converter),
    };

    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs));
    let app = create_router(state).layer(timeout);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
