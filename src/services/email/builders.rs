// Email Builders - one builder per email the storefront sends

use super::types::{CredentialsEmailData, EmailBuilder, EmailError, EmailMessage};
use crate::{app_config::EmailConfig, models::Credentials};
use handlebars::Handlebars;
use tracing::instrument;

/// Builder for the "your WiFi login" email sent after a successful payment
pub struct CredentialsEmailBuilder<'a> {
    to_email: &'a str,
    plan_type: &'a str,
    reference: &'a str,
    credentials: &'a Credentials,
    app_url: &'a str,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> CredentialsEmailBuilder<'a> {
    pub fn new(
        to_email: &'a str,
        plan_type: &'a str,
        reference: &'a str,
        credentials: &'a Credentials,
        app_url: &'a str,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            to_email,
            plan_type,
            reference,
            credentials,
            app_url,
            config,
            templates,
        }
    }
}

/// "daily" -> "Daily"
pub fn plan_label(plan_type: &str) -> String {
    let mut chars = plan_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<'a> EmailBuilder for CredentialsEmailBuilder<'a> {
    #[instrument(skip(self), fields(to = %self.to_email, reference = %self.reference))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = CredentialsEmailData {
            plan_label: plan_label(self.plan_type),
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
            reference: self.reference.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.app_url.trim_end_matches('/').to_string(),
            support_email: self.config.support_email.clone(),
        };

        // Handlebars escapes HTML in {{...}} so credentials render verbatim
        let html = self
            .templates
            .render("wifi_credentials", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Your WiFi Login Details\n\n\
            Plan: {}\n\
            Username: {}\n\
            Password: {}\n\
            Payment reference: {}\n\n\
            Thank you for choosing {}!\n\
            Need help? Contact {}.",
            data.plan_label,
            data.username,
            data.password,
            data.reference,
            data.app_name,
            data.support_email
        );

        Ok(EmailMessage {
            from: format!("{} <{}>", self.config.from_name, self.config.from_email),
            to: vec![self.to_email.to_string()],
            subject: "Your WiFi Credentials".to_string(),
            html,
            text: Some(text),
            reply_to: Some(self.config.support_email.clone()),
        })
    }
}
