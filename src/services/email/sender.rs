// Email Sender - delivers messages through a Resend-compatible HTTP API

use super::types::{EmailError, EmailMessage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Email sender that handles delivery to the email provider
#[derive(Clone)]
pub struct EmailSender {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

/// Delay before retrying after failed attempt number `attempt` (1-based):
/// `base * 2^(attempt-1)`, capped at 60s, without jitter
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = 2_u32
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.checked_mul(exp)
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY)
}

/// Add 0-25% random jitter
fn with_jitter(delay: Duration) -> Duration {
    let mut rng = StdRng::from_entropy();
    let jitter_millis = rng.gen_range(0..=(delay.as_millis() / 4) as u64);
    delay + Duration::from_millis(jitter_millis)
}

impl EmailSender {
    /// `timeout` bounds every single request to the mail API
    pub fn new_resend(
        api_key: String,
        api_url: String,
        timeout: Duration,
    ) -> Result<Self, EmailError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmailError::Client(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            api_key,
            api_url,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Send an email message once
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                info!("Email sent successfully");
                Ok(())
            },
            Ok(res) => {
                let status = res.status();
                let error_text = res
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                error!(
                    "Failed to send email. Status: {}, Error: {}",
                    status, error_text
                );

                if status.as_u16() == 429 {
                    Err(EmailError::RateLimitExceeded)
                } else if status.is_server_error() {
                    Err(EmailError::ServiceUnavailable)
                } else {
                    Err(EmailError::SendError(format!(
                        "Email send failed with status {}: {}",
                        status, error_text
                    )))
                }
            },
            Err(e) => {
                error!("Network error while sending email: {:?}", e);
                Err(EmailError::Network(e.to_string()))
            },
        }
    }

    /// Send an email, retrying transient failures with exponential backoff
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send_with_retry(&self, message: EmailMessage) -> Result<(), EmailError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.send(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() => {
                    warn!("Email send attempt {} failed permanently: {}", attempt, e);
                    return Err(e);
                },
                Err(e) => {
                    warn!("Email send attempt {} failed: {}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        let delay = with_jitter(backoff_delay(self.retry_delay, attempt));
                        info!("Retrying in {:?} (with jitter)", delay);
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EmailError::SendError("Failed after maximum retry attempts".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "Flint WiFi <noreply@flint.test>".to_string(),
            to: vec!["ama@example.com".to_string()],
            subject: "Your WiFi Credentials".to_string(),
            html: "<h1>Hi</h1>".to_string(),
            text: None,
            reply_to: None,
        }
    }

    fn sender_for(server: &MockServer) -> EmailSender {
        EmailSender::new_resend(
            "re_test".to_string(),
            server.url("/emails"),
            Duration::from_millis(300),
        )
        .unwrap()
        .with_max_retries(3)
        .with_retry_delay(Duration::from_millis(5))
    }

    #[test]
    fn test_backoff_delay_doubles() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        assert_eq!(
            backoff_delay(Duration::from_secs(2), 50),
            Duration::from_secs(60)
        );
        assert_eq!(
            backoff_delay(Duration::from_secs(u32::MAX as u64), 2),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let base = Duration::from_millis(400);
        for _ in 0..50 {
            let delay = with_jitter(base);
            assert!(delay >= base && delay <= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_payload_omits_empty_optionals() {
        let value = serde_json::to_value(message()).unwrap();
        assert!(value.get("text").is_none());
        assert!(value.get("reply_to").is_none());
        assert_eq!(value["to"], json!(["ama@example.com"]));
    }

    #[tokio::test]
    async fn test_send_posts_payload_with_bearer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/emails")
                    .header("authorization", "Bearer re_test")
                    .json_body_partial(r#"{"subject": "Your WiFi Credentials"}"#);
                then.status(200).json_body(json!({ "id": "email_1" }));
            })
            .await;

        sender_for(&server).send(message()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/emails");
                then.status(502);
            })
            .await;

        let err = sender_for(&server)
            .send_with_retry(message())
            .await
            .unwrap_err();

        assert!(matches!(err, EmailError::ServiceUnavailable));
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/emails");
                then.status(429);
            })
            .await;

        let err = sender_for(&server)
            .send_with_retry(message())
            .await
            .unwrap_err();

        assert!(matches!(err, EmailError::RateLimitExceeded));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/emails");
                then.status(422).body("invalid from address");
            })
            .await;

        let err = sender_for(&server)
            .send_with_retry(message())
            .await
            .unwrap_err();

        assert!(matches!(err, EmailError::SendError(_)));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_stalled_provider_times_out_each_attempt() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/emails");
                then.status(200).delay(Duration::from_secs(5));
            })
            .await;

        let started = std::time::Instant::now();
        let err = sender_for(&server)
            .send_with_retry(message())
            .await
            .unwrap_err();

        assert!(matches!(err, EmailError::Network(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
        mock.assert_hits_async(3).await;
    }
}
