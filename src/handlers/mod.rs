pub mod credentials;
pub mod docs;
pub mod extract;
pub mod health;
pub mod payments;
pub mod plans;

use crate::{app::AppState, middleware::lookup_rate_limit};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

/// Routes mounted under /api
pub fn api_routes(state: AppState) -> Router<AppState> {
    // Lookups take guessable input, so they are throttled per client IP
    let lookups = Router::new()
        .route("/manual-verify", post(payments::manual_verify))
        .route("/retrieve-credentials", post(credentials::retrieve_credentials))
        .route_layer(middleware::from_fn_with_state(state.clone(), lookup_rate_limit));

    let router = Router::new()
        .route("/plans", get(plans::list_plans))
        .route("/init-payment", post(payments::init_payment))
        .route("/verify-payment", post(payments::verify_payment))
        .merge(lookups);

    if state.config.features.enable_api_docs {
        tracing::info!("API docs enabled at /api/openapi.json");
        router.route("/openapi.json", get(docs::serve_openapi_spec))
    } else {
        router
    }
}
