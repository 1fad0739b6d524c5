// Email Service Types - Shared types and structures for email module

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during email operations
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Delivery did not finish within {0:?}")]
    DeliveryTimeout(std::time::Duration),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl EmailError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmailError::Network(_) | EmailError::ServiceUnavailable)
    }
}

/// An outgoing email, serialized as-is into the Resend `POST /emails` body.
/// `text` and `reply_to` are left out of the JSON when unset.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Trait that all email builders must implement
pub trait EmailBuilder {
    fn build(&self) -> Result<EmailMessage, EmailError>;
}

/// Data structure for the credentials email template
#[derive(Serialize)]
pub struct CredentialsEmailData {
    pub plan_label: String,
    pub username: String,
    pub password: String,
    pub reference: String,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
}
