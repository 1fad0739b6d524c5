// Email Service Module
// Orchestrates template builders and the retrying sender

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::{app_config::EmailConfig, models::Credentials};
use anyhow::Result;
use builders::CredentialsEmailBuilder;
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Email service for customer notifications
#[derive(Clone)]
pub struct EmailService {
    sender: EmailSender,
    delivery_timeout: Duration,
    config: EmailConfig,
    app_url: String,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    /// `app_url` is the public storefront URL linked from emails
    pub fn new(config: EmailConfig, app_url: impl Into<String>) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        Self::register_templates(&mut templates)?;

        let sender = EmailSender::new_resend(
            config.resend_api_key.clone(),
            config.resend_api_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?
        .with_max_retries(config.max_retries)
        .with_retry_delay(Duration::from_millis(config.retry_delay_ms));

        Ok(Self {
            sender,
            delivery_timeout: Duration::from_secs(config.delivery_timeout_secs),
            config,
            app_url: app_url.into(),
            templates: Arc::new(templates),
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), types::EmailError> {
        let credentials_template = include_str!("../../templates/email/wifi_credentials.html");
        templates
            .register_template_string("wifi_credentials", credentials_template)
            .map_err(|e| types::EmailError::TemplateError(e.to_string()))?;

        Ok(())
    }

    /// Email a freshly issued login to the payer.
    /// Gives up once `EMAIL_DELIVERY_TIMEOUT_SECS` has passed, retries included.
    #[instrument(skip(self, credentials))]
    pub async fn send_credentials_email(
        &self,
        to_email: &str,
        plan_type: &str,
        reference: &str,
        credentials: &Credentials,
    ) -> Result<(), EmailError> {
        info!("Sending WiFi credentials email to {}", to_email);

        let message = CredentialsEmailBuilder::new(
            to_email,
            plan_type,
            reference,
            credentials,
            &self.app_url,
            &self.config,
            &self.templates,
        )
        .build()?;

        tokio::time::timeout(self.delivery_timeout, self.sender.send_with_retry(message))
            .await
            .map_err(|_| EmailError::DeliveryTimeout(self.delivery_timeout))?
    }
}

// Re-export commonly used types for convenience
pub use types::{EmailError, EmailMessage};
