// HTTP-facing error type: every handler failure renders as {"error": "<message>"}
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{issuance::IssuanceError, store::StoreError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Payment provider unavailable")]
    UpstreamUnavailable,

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    InternalError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Surface the first human-readable message
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());
        ApiError::ValidationError(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        tracing::error!("Store failure: {}", error);
        ApiError::InternalError
    }
}

impl From<IssuanceError> for ApiError {
    fn from(error: IssuanceError) -> Self {
        match error {
            IssuanceError::PlanNotFound => ApiError::BadRequest(error.to_string()),
            IssuanceError::PlanDisabled => ApiError::Forbidden(error.to_string()),
            IssuanceError::VerificationFailed => ApiError::BadRequest(error.to_string()),
            IssuanceError::AmountTooLow { .. } => {
                ApiError::BadRequest("Payment amount does not cover the plan price".to_string())
            },
            IssuanceError::EmailMismatch => ApiError::Conflict(error.to_string()),
            IssuanceError::OutOfStock(_) => ApiError::ServiceUnavailable(
                "No credentials available for this plan. Please contact support".to_string(),
            ),
            IssuanceError::CustomerNotFound
            | IssuanceError::NoTransactions
            | IssuanceError::ReferenceNotFound
            | IssuanceError::CredentialsNotFound => ApiError::NotFound(error.to_string()),
            IssuanceError::Gateway(e) => {
                tracing::error!("Paystack failure: {}", e);
                ApiError::UpstreamUnavailable
            },
            IssuanceError::Store(e) => ApiError::from(e),
        }
    }
}
