// Paystack API types - response shapes for the endpoints this service calls

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors talking to the Paystack API
#[derive(Error, Debug)]
pub enum PaystackError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Paystack unavailable (HTTP {0})")]
    Unavailable(u16),

    #[error("Invalid response from Paystack: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Every Paystack response is wrapped in this envelope
#[derive(Debug, Deserialize)]
pub struct PaystackEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaystackCustomer {
    pub id: i64,
    pub email: String,
}

/// A transaction as returned by `/transaction/verify/:reference` and `/transaction`
#[derive(Debug, Clone, Deserialize)]
pub struct PaystackTransaction {
    pub reference: String,
    pub status: String,
    /// Amount in currency subunits
    pub amount: i64,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub customer: Option<PaystackCustomer>,
}

impl PaystackTransaction {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }

    /// When the money moved: `paid_at`, falling back to `created_at`
    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        [self.paid_at.as_deref(), self.created_at.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Plan type recorded in the checkout metadata, if any
    pub fn metadata_plan_type(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("plan_type"))
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer.as_ref().map(|c| c.email.as_str())
    }
}
