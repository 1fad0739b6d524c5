// Lookup of credentials already issued for a recorded payment

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::extract::ApiJson;
use crate::{app::AppState, models::Credentials, utils::ApiError};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveCredentialsRequest {
    #[validate(length(min = 1, max = 100, message = "Payment reference is required"))]
    pub reference: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    /// Send the credentials email again
    #[serde(default)]
    pub resend_email: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveCredentialsResponse {
    pub success: bool,
    pub credentials: Credentials,
    pub reference: String,
    pub plan_type: String,
}

/// Fetch the login issued for a payment reference
/// POST /api/retrieve-credentials
#[utoipa::path(
    post,
    path = "/api/retrieve-credentials",
    tag = "Credentials",
    operation_id = "retrieveCredentials",
    request_body = RetrieveCredentialsRequest,
    responses(
        (status = 200, description = "Credentials for the payment", body = RetrieveCredentialsResponse),
        (status = 400, description = "Invalid input", body = crate::handlers::docs::ErrorBody),
        (status = 404, description = "No credentials for this reference and email", body = crate::handlers::docs::ErrorBody),
        (status = 429, description = "Too many lookups", body = crate::handlers::docs::ErrorBody)
    )
)]
pub async fn retrieve_credentials(
    State(state): State<AppState>,
    ApiJson(mut request): ApiJson<RetrieveCredentialsRequest>,
) -> Result<Json<RetrieveCredentialsResponse>, ApiError> {
    request.reference = request.reference.trim().to_string();
    request.email = request.email.trim().to_string();
    request.validate()?;

    let issued = state
        .issuance
        .retrieve_credentials(&request.reference, &request.email, request.resend_email)
        .await?;

    Ok(Json(RetrieveCredentialsResponse {
        success: true,
        credentials: issued.credentials,
        reference: issued.reference,
        plan_type: issued.plan_type,
    }))
}
