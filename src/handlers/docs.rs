// OpenAPI document for the public API
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::{openapi::server::Server, OpenApi, ToSchema};

use crate::{
    app::AppState,
    app_config::AppConfig,
    handlers::{
        credentials::{RetrieveCredentialsRequest, RetrieveCredentialsResponse},
        health::HealthResponse,
        payments::{
            InitPaymentRequest, ManualVerifyRequest, ManualVerifyResponse, VerifyPaymentRequest,
            VerifyPaymentResponse,
        },
    },
    models::{Credentials, Plan},
    services::issuance::{CheckoutMetadata, PaymentInit},
};

/// Body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flint WiFi API",
        description = "Plans, Paystack checkout and WiFi credential issuance"
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::plans::list_plans,
        crate::handlers::payments::init_payment,
        crate::handlers::payments::verify_payment,
        crate::handlers::payments::manual_verify,
        crate::handlers::credentials::retrieve_credentials,
    ),
    components(
        schemas(
            Plan,
            Credentials,
            PaymentInit,
            CheckoutMetadata,
            InitPaymentRequest,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            ManualVerifyRequest,
            ManualVerifyResponse,
            RetrieveCredentialsRequest,
            RetrieveCredentialsResponse,
            HealthResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Plans", description = "Purchasable access plans"),
        (name = "Payments", description = "Checkout and payment verification"),
        (name = "Credentials", description = "Lookup of issued credentials")
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI document, advertising the configured public URL
pub fn build_openapi_spec(config: &AppConfig) -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();

    let mut servers = vec![Server::new(config.server.public_base_url.clone())];
    if !config.is_production() {
        servers.push(Server::new(format!("http://{}", config.server.bind_address)));
    }
    spec.servers = Some(servers);
    spec
}

/// Serve OpenAPI JSON at /api/openapi.json
pub async fn serve_openapi_spec(State(state): State<AppState>) -> Response {
    match build_openapi_spec(&state.config).to_json() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to render OpenAPI document: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}
