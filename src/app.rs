// Application state and wiring
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    middleware::{
        new_lookup_rate_limiter, spawn_limiter_pruning, LookupRateLimiter, LIMITER_PRUNE_INTERVAL,
    },
    services::{CredentialStore, EmailService, IssuanceService, PaystackClient},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CredentialStore>,
    pub issuance: Arc<IssuanceService>,
    pub lookup_limiter: Arc<LookupRateLimiter>,
}

impl AppState {
    /// Wire the services around a credential store.
    /// Must be called inside a Tokio runtime; it starts the limiter pruning task.
    pub fn new(config: AppConfig, store: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        let paystack = PaystackClient::new(&config.paystack)?;
        let email_service = Arc::new(EmailService::new(
            config.email.clone(),
            config.server.public_base_url.clone(),
        )?);

        let issuance = Arc::new(IssuanceService::new(
            store.clone(),
            paystack,
            email_service,
            config.paystack.clone(),
            config.recovery.clone(),
        ));

        let lookup_limiter = Arc::new(new_lookup_rate_limiter(
            config.security.lookup_rate_limit_per_minute,
        ));
        spawn_limiter_pruning(&lookup_limiter, LIMITER_PRUNE_INTERVAL);

        Ok(Self {
            config: Arc::new(config),
            store,
            issuance,
            lookup_limiter,
        })
    }
}
