// Checkout, payment verification and manual recovery endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::form_urlencoded;
use utoipa::ToSchema;
use validator::Validate;

use super::extract::ApiJson;
use crate::{
    app::AppState,
    models::Credentials,
    services::issuance::{ManualOutcome, PaymentInit, VerifyPayment},
    utils::{trim_optional_field, ApiError},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitPaymentRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "Plan type is required"))]
    pub plan_type: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, max = 100, message = "Payment reference is required"))]
    pub reference: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub plan_type: Option<String>,
    /// Price the browser showed, in major units. Informational only.
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub credentials: Credentials,
    pub redirect_url: String,
    pub already_processed: bool,
    pub reference: String,
    pub plan_type: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualVerifyRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualVerifyResponse {
    /// One of `processed`, `exists`, `unprocessed`
    pub status: String,
    pub message: String,
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

/// Where the browser shows freshly issued credentials
pub fn credentials_redirect_url(credentials: &Credentials) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("username", &credentials.username)
        .append_pair("password", &credentials.password)
        .finish();
    format!("/credentials.html?{}", query)
}

/// Price a checkout for the Paystack widget
/// POST /api/init-payment
#[utoipa::path(
    post,
    path = "/api/init-payment",
    tag = "Payments",
    operation_id = "initPayment",
    request_body = InitPaymentRequest,
    responses(
        (status = 200, description = "Checkout parameters", body = PaymentInit),
        (status = 400, description = "Invalid email or unknown plan", body = crate::handlers::docs::ErrorBody),
        (status = 403, description = "Plan disabled", body = crate::handlers::docs::ErrorBody)
    )
)]
pub async fn init_payment(
    State(state): State<AppState>,
    ApiJson(mut request): ApiJson<InitPaymentRequest>,
) -> Result<Json<PaymentInit>, ApiError> {
    request.email = request.email.trim().to_string();
    request.plan_type = request.plan_type.trim().to_string();
    request.validate()?;

    let init = state
        .issuance
        .init_payment(&request.email, &request.plan_type)
        .await?;

    Ok(Json(init))
}

/// Verify a completed payment and issue its credentials
/// POST /api/verify-payment
#[utoipa::path(
    post,
    path = "/api/verify-payment",
    tag = "Payments",
    operation_id = "verifyPayment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Credentials issued or previously issued", body = VerifyPaymentResponse),
        (status = 400, description = "Invalid input or payment not successful", body = crate::handlers::docs::ErrorBody),
        (status = 409, description = "Payment belongs to another email", body = crate::handlers::docs::ErrorBody),
        (status = 502, description = "Paystack unreachable", body = crate::handlers::docs::ErrorBody),
        (status = 503, description = "No credentials left for the plan", body = crate::handlers::docs::ErrorBody)
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    ApiJson(mut request): ApiJson<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    request.reference = request.reference.trim().to_string();
    request.email = request.email.trim().to_string();
    request.validate()?;

    let issued = state
        .issuance
        .verify_payment(&VerifyPayment {
            reference: request.reference,
            email: request.email,
            plan_type: trim_optional_field(request.plan_type.as_ref()),
            amount: request.amount,
        })
        .await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        redirect_url: credentials_redirect_url(&issued.credentials),
        credentials: issued.credentials,
        already_processed: issued.already_processed,
        reference: issued.reference,
        plan_type: issued.plan_type,
    }))
}

/// Recover a payment whose browser callback never arrived
/// POST /api/manual-verify
#[utoipa::path(
    post,
    path = "/api/manual-verify",
    tag = "Payments",
    operation_id = "manualVerify",
    request_body = ManualVerifyRequest,
    responses(
        (status = 200, description = "Lookup outcome; a payment Paystack has not marked successful is reported as unprocessed", body = ManualVerifyResponse),
        (status = 400, description = "Invalid input, unknown plan or underpaid amount", body = crate::handlers::docs::ErrorBody),
        (status = 404, description = "Customer, transactions or reference unknown to Paystack", body = crate::handlers::docs::ErrorBody),
        (status = 409, description = "Payment belongs to another email", body = crate::handlers::docs::ErrorBody),
        (status = 429, description = "Too many lookups", body = crate::handlers::docs::ErrorBody),
        (status = 502, description = "Paystack unreachable", body = crate::handlers::docs::ErrorBody),
        (status = 503, description = "No credentials left for the plan", body = crate::handlers::docs::ErrorBody)
    )
)]
pub async fn manual_verify(
    State(state): State<AppState>,
    ApiJson(mut request): ApiJson<ManualVerifyRequest>,
) -> Result<Json<ManualVerifyResponse>, ApiError> {
    request.email = request.email.trim().to_string();
    request.validate()?;
    let reference = trim_optional_field(request.reference.as_ref());

    let outcome = state
        .issuance
        .manual_verify(&request.email, reference.as_deref())
        .await?;

    let response = match outcome {
        ManualOutcome::Processed(issued) => {
            info!("Manual verification issued credentials for {}", issued.reference);
            ManualVerifyResponse {
                status: "processed".to_string(),
                message: "Payment verified. Your credentials have been issued and emailed"
                    .to_string(),
                reference: Some(issued.reference),
                credentials: Some(issued.credentials),
            }
        },
        ManualOutcome::Exists { reference } => ManualVerifyResponse {
            status: "exists".to_string(),
            message: "This payment was already processed. Retrieve your credentials with the \
                      payment reference"
                .to_string(),
            reference: Some(reference),
            credentials: None,
        },
        ManualOutcome::Unprocessed { reference, message } => ManualVerifyResponse {
            status: "unprocessed".to_string(),
            message,
            reference,
            credentials: None,
        },
    };

    Ok(Json(response))
}
