// Library exports for Flint WiFi Backend
// The binary and the integration tests both build the router from here

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use db::{DieselDatabaseConfig, DieselPool};
pub use services::{
    CredentialStore, EmailService, IssuanceService, PaystackClient, PgCredentialStore,
};
pub use utils::ApiError;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

/// Connect to Postgres, apply migrations and wire the services
pub async fn initialize_app_state(
    config: AppConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    info!("Initializing database pool...");
    let diesel_pool = db::create_diesel_pool(DieselDatabaseConfig::from(&config.database)).await?;

    if migrations::should_run_migrations(&config) {
        info!("Running embedded migrations...");
        migrations::run_all_migrations(&config).await?;
    } else {
        info!("Embedded migrations disabled");
    }

    let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(diesel_pool));

    Ok(AppState::new(config, store)?)
}

/// Full HTTP surface: health, the JSON API and the storefront's static files
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.server.public_dir);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api", handlers::api_routes(state.clone()))
        .fallback_service(static_files)
        .layer(axum_middleware::from_fn_with_state(
            state.config.clone(),
            middleware::dynamic_cors_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
