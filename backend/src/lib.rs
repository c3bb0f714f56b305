//! School Food Supply platform - backend core
//!
//! Coordinates weekly food-supply requirement records for a network of
//! schools: supply/consumption calendar generation, the multi-role approval
//! workflow and the substitution/consolidation engine. Thin callers (HTTP
//! handlers, jobs) construct an [`AppState`] and drive the services.

use std::{sync::Arc, time::Duration};

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod error;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorDetail};

/// Application state shared across callers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
}

/// Initialize tracing with an environment-driven filter
///
/// Called once by the hosting process before any service work.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sfs_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load configuration and connect the database pool
pub async fn bootstrap() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Environment: {}", config.environment);

    let db = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    Ok(AppState {
        db,
        config: Arc::new(config),
    })
}
