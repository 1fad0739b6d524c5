// Paystack REST client
// Only the read endpoints needed to confirm that money was received

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::types::{PaystackCustomer, PaystackEnvelope, PaystackError, PaystackTransaction};
use crate::app_config::PaystackConfig;

#[derive(Clone)]
pub struct PaystackClient {
    client: Arc<Client>,
    secret_key: String,
    base_url: Url,
}

impl PaystackClient {
    pub fn new(config: &PaystackConfig) -> Result<Self, PaystackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaystackError::InvalidRequest(format!("HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.api_url)
            .map_err(|e| PaystackError::InvalidRequest(format!("PAYSTACK_API_URL: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            secret_key: config.secret_key.clone(),
            base_url,
        })
    }

    /// Build `<base>/<segments...>` with every segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PaystackError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PaystackError::InvalidRequest("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<PaystackEnvelope<T>, PaystackError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                error!("Network error while calling Paystack: {}", e);
                PaystackError::Network(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Paystack responded with {}", status);
            return Err(PaystackError::Unavailable(status.as_u16()));
        }
        if status == StatusCode::UNAUTHORIZED {
            error!("Paystack rejected the secret key");
            return Err(PaystackError::InvalidRequest("unauthorized".to_string()));
        }

        // 4xx bodies still carry the {status: false, message} envelope
        response.json::<PaystackEnvelope<T>>().await.map_err(|e| {
            error!("Undecodable Paystack response (HTTP {}): {}", status, e);
            PaystackError::InvalidResponse(e.to_string())
        })
    }

    /// Verify a transaction by reference.
    /// `Ok(None)` when Paystack does not know the reference.
    #[instrument(skip(self))]
    pub async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<Option<PaystackTransaction>, PaystackError> {
        let url = self.endpoint(&["transaction", "verify", reference])?;
        let envelope = self.get::<PaystackTransaction>(url).await?;

        if !envelope.status {
            debug!("Verification rejected: {}", envelope.message);
            return Ok(None);
        }
        Ok(envelope.data)
    }

    /// Look a customer up by email
    #[instrument(skip(self))]
    pub async fn fetch_customer(
        &self,
        email: &str,
    ) -> Result<Option<PaystackCustomer>, PaystackError> {
        let url = self.endpoint(&["customer", email])?;
        let envelope = self.get::<PaystackCustomer>(url).await?;

        if !envelope.status {
            debug!("Customer lookup rejected: {}", envelope.message);
            return Ok(None);
        }
        Ok(envelope.data)
    }

    /// Most recent transactions of a customer, newest first
    #[instrument(skip(self))]
    pub async fn list_customer_transactions(
        &self,
        customer_id: i64,
        per_page: u32,
    ) -> Result<Vec<PaystackTransaction>, PaystackError> {
        let mut url = self.endpoint(&["transaction"])?;
        url.query_pairs_mut()
            .append_pair("customer", &customer_id.to_string())
            .append_pair("perPage", &per_page.to_string());

        let envelope = self.get::<Vec<PaystackTransaction>>(url).await?;

        if !envelope.status {
            debug!("Transaction listing rejected: {}", envelope.message);
            return Ok(Vec::new());
        }
        Ok(envelope.data.unwrap_or_default())
    }
}
