// Credential issuance - confirm payment with Paystack, allocate a login, notify the payer
//
// Every path that hands out a login goes through `issue_for_transaction`, and the
// database procedure behind `CredentialStore::issue_credentials` is idempotent per
// payment reference, so a payment can never yield two logins or reach a second email.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    app_config::{PaystackConfig, RecoveryConfig},
    models::{Credentials, Plan},
    services::{
        email::EmailService,
        paystack::{PaystackClient, PaystackError, PaystackTransaction},
        store::{Allocation, CredentialStore, IssueRequest, StoreError},
    },
    utils::{emails_match, generate_reference, plan_type_from_reference},
};

#[derive(Error, Debug)]
pub enum IssuanceError {
    #[error("Plan not found")]
    PlanNotFound,

    #[error("This plan is currently disabled")]
    PlanDisabled,

    #[error("Payment verification failed")]
    VerificationFailed,

    #[error("Paid amount {paid} is below the plan price {expected}")]
    AmountTooLow { paid: i64, expected: i64 },

    #[error("Payment belongs to a different email address")]
    EmailMismatch,

    #[error("No credentials available for plan {0}")]
    OutOfStock(String),

    #[error("Customer not found on Paystack")]
    CustomerNotFound,

    #[error("No transactions found for this customer")]
    NoTransactions,

    #[error("Payment reference not found on Paystack")]
    ReferenceNotFound,

    #[error("No credentials found for this payment")]
    CredentialsNotFound,

    #[error(transparent)]
    Gateway(#[from] PaystackError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Checkout parameters handed to the Paystack inline widget
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentInit {
    pub key: String,
    pub email: String,
    /// Amount in currency subunits
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub metadata: CheckoutMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutMetadata {
    pub plan_type: String,
    pub custom_reference: String,
}

/// A login handed out for one payment
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub credentials: Credentials,
    pub reference: String,
    pub plan_type: String,
    /// The payment had been processed before this call; no email was sent
    pub already_processed: bool,
}

/// Result of a manual payment lookup
#[derive(Debug, Clone)]
pub enum ManualOutcome {
    Processed(IssuedCredentials),
    /// A payment for this customer was processed earlier
    Exists { reference: String },
    Unprocessed { reference: Option<String>, message: String },
}

/// What the browser reports after the Paystack widget closes
#[derive(Debug, Clone)]
pub struct VerifyPayment {
    pub reference: String,
    pub email: String,
    pub plan_type: Option<String>,
    pub amount: Option<i64>,
}

pub struct IssuanceService {
    store: Arc<dyn CredentialStore>,
    paystack: PaystackClient,
    email: Arc<EmailService>,
    checkout: PaystackConfig,
    recovery: RecoveryConfig,
}

impl IssuanceService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        paystack: PaystackClient,
        email: Arc<EmailService>,
        checkout: PaystackConfig,
        recovery: RecoveryConfig,
    ) -> Self {
        Self {
            store,
            paystack,
            email,
            checkout,
            recovery,
        }
    }

    pub async fn list_plans(&self) -> Result<Vec<Plan>, IssuanceError> {
        Ok(self.store.list_plans().await?)
    }

    /// Price a checkout for `plan_type` and mint its reference
    #[instrument(skip(self))]
    pub async fn init_payment(
        &self,
        email: &str,
        plan_type: &str,
    ) -> Result<PaymentInit, IssuanceError> {
        let plan = self
            .store
            .find_plan(plan_type)
            .await?
            .ok_or(IssuanceError::PlanNotFound)?;

        if !plan.enabled {
            return Err(IssuanceError::PlanDisabled);
        }

        let reference = generate_reference(&plan.plan_type);
        info!("Initialized checkout {} for {}", reference, email);

        Ok(PaymentInit {
            key: self.checkout.public_key.clone(),
            email: email.to_string(),
            amount: plan.amount_minor(),
            currency: self.checkout.currency.clone(),
            metadata: CheckoutMetadata {
                plan_type: plan.plan_type.clone(),
                custom_reference: reference.clone(),
            },
            reference,
            split_code: self.checkout.split_code.clone(),
        })
    }

    /// Confirm a payment the browser reported and hand out its login
    #[instrument(skip(self, request), fields(reference = %request.reference))]
    pub async fn verify_payment(
        &self,
        request: &VerifyPayment,
    ) -> Result<IssuedCredentials, IssuanceError> {
        if let Some(existing) = self.already_issued(&request.reference, &request.email).await? {
            return Ok(existing);
        }

        let transaction = self
            .paystack
            .verify_transaction(&request.reference)
            .await?
            .ok_or(IssuanceError::VerificationFailed)?;

        if !transaction.is_successful() {
            warn!(
                "Payment {} has status {}, refusing to issue",
                transaction.reference, transaction.status
            );
            return Err(IssuanceError::VerificationFailed);
        }

        if let Some(claimed) = request.amount {
            if claimed.checked_mul(100) != Some(transaction.amount) {
                warn!(
                    "Client reported amount {} but Paystack recorded {}",
                    claimed, transaction.amount
                );
            }
        }

        self.issue_for_transaction(&transaction, &request.email, request.plan_type.as_deref())
            .await
    }

    /// Recover a payment whose browser callback never arrived
    #[instrument(skip(self))]
    pub async fn manual_verify(
        &self,
        email: &str,
        reference: Option<&str>,
    ) -> Result<ManualOutcome, IssuanceError> {
        match reference {
            Some(reference) => self.manual_verify_reference(email, reference).await,
            None => self.manual_verify_email(email).await,
        }
    }

    /// Login already issued for `reference`, provided it belongs to `email`
    #[instrument(skip(self))]
    pub async fn retrieve_credentials(
        &self,
        reference: &str,
        email: &str,
        resend_email: bool,
    ) -> Result<IssuedCredentials, IssuanceError> {
        let (transaction, credentials) = self
            .store
            .find_credentials(reference, email)
            .await?
            .ok_or(IssuanceError::CredentialsNotFound)?;

        if resend_email {
            self.notify(
                &transaction.customer_email,
                &transaction.plan_type,
                &transaction.payment_reference,
                &credentials,
            )
            .await;
        }

        Ok(IssuedCredentials {
            credentials,
            reference: transaction.payment_reference,
            plan_type: transaction.plan_type,
            already_processed: true,
        })
    }

    async fn manual_verify_reference(
        &self,
        email: &str,
        reference: &str,
    ) -> Result<ManualOutcome, IssuanceError> {
        if self.already_issued(reference, email).await?.is_some() {
            return Ok(ManualOutcome::Exists {
                reference: reference.to_string(),
            });
        }

        let transaction = self
            .paystack
            .verify_transaction(reference)
            .await?
            .ok_or(IssuanceError::ReferenceNotFound)?;

        if !transaction.is_successful() {
            return Ok(ManualOutcome::Unprocessed {
                reference: Some(transaction.reference.clone()),
                message: format!("Payment status is '{}'", transaction.status),
            });
        }

        let issued = self.issue_for_transaction(&transaction, email, None).await?;
        Ok(ManualOutcome::Processed(issued))
    }

    async fn manual_verify_email(&self, email: &str) -> Result<ManualOutcome, IssuanceError> {
        let customer = self
            .paystack
            .fetch_customer(email)
            .await?
            .ok_or(IssuanceError::CustomerNotFound)?;

        let transactions = self
            .paystack
            .list_customer_transactions(customer.id, self.recovery.transaction_limit)
            .await?;

        if transactions.is_empty() {
            return Err(IssuanceError::NoTransactions);
        }

        let since = Utc::now() - Duration::days(self.recovery.lookback_days);

        for transaction in &transactions {
            if !transaction.is_successful() {
                continue;
            }
            match transaction.settled_at() {
                Some(at) if at >= since => {},
                _ => continue,
            }
            if self
                .store
                .find_transaction(&transaction.reference)
                .await?
                .is_some()
            {
                continue;
            }

            info!(
                "Recovering unprocessed payment {} for {}",
                transaction.reference, email
            );
            let issued = self.issue_for_transaction(transaction, email, None).await?;
            return Ok(ManualOutcome::Processed(issued));
        }

        if let Some(recent) = self.store.find_recent_transaction(email, since).await? {
            return Ok(ManualOutcome::Exists {
                reference: recent.payment_reference,
            });
        }

        Ok(ManualOutcome::Unprocessed {
            reference: None,
            message: format!(
                "No successful unprocessed payments found in the last {} days",
                self.recovery.lookback_days
            ),
        })
    }

    /// Already-processed short circuit. A reference recorded for another
    /// email is reported as a mismatch rather than leaking its login.
    async fn already_issued(
        &self,
        reference: &str,
        email: &str,
    ) -> Result<Option<IssuedCredentials>, IssuanceError> {
        if self.store.find_transaction(reference).await?.is_none() {
            return Ok(None);
        }

        let (transaction, credentials) = self
            .store
            .find_credentials(reference, email)
            .await?
            .ok_or(IssuanceError::EmailMismatch)?;

        info!("Payment {} was already processed", reference);

        Ok(Some(IssuedCredentials {
            credentials,
            reference: transaction.payment_reference,
            plan_type: transaction.plan_type,
            already_processed: true,
        }))
    }

    /// Allocate a login for a transaction Paystack reported as successful
    async fn issue_for_transaction(
        &self,
        transaction: &PaystackTransaction,
        email: &str,
        requested_plan: Option<&str>,
    ) -> Result<IssuedCredentials, IssuanceError> {
        if let Some(payer) = transaction.customer_email() {
            if !emails_match(payer, email) {
                warn!(
                    "Payment {} was made by a different email address",
                    transaction.reference
                );
                return Err(IssuanceError::EmailMismatch);
            }
        }

        let plan_type = transaction
            .metadata_plan_type()
            .or(requested_plan)
            .or_else(|| plan_type_from_reference(&transaction.reference))
            .ok_or(IssuanceError::PlanNotFound)?
            .to_string();

        let plan = self
            .store
            .find_plan(&plan_type)
            .await?
            .ok_or(IssuanceError::PlanNotFound)?;

        // A paid-for plan is honoured even if it was disabled since checkout
        if transaction.amount < plan.amount_minor() {
            return Err(IssuanceError::AmountTooLow {
                paid: transaction.amount,
                expected: plan.amount_minor(),
            });
        }

        let request = IssueRequest {
            reference: transaction.reference.clone(),
            email: email.to_string(),
            plan_type: plan.plan_type.clone(),
            amount: transaction.amount,
        };

        // A concurrent request for the same reference may have won the race
        // after `already_issued` ran; only the first one sends the email
        let credentials = match self.store.issue_credentials(&request).await? {
            Allocation::Issued(credentials) => credentials,
            Allocation::Replayed(credentials) => {
                info!("Payment {} was processed concurrently", transaction.reference);
                return Ok(IssuedCredentials {
                    credentials,
                    reference: transaction.reference.clone(),
                    plan_type: plan.plan_type,
                    already_processed: true,
                });
            },
            Allocation::ClaimedByOther => {
                warn!(
                    "Payment {} was already claimed by another email",
                    transaction.reference
                );
                return Err(IssuanceError::EmailMismatch);
            },
            Allocation::OutOfStock => {
                error!("Out of credentials for plan {}", plan.plan_type);
                return Err(IssuanceError::OutOfStock(plan.plan_type));
            },
        };

        info!(
            "Issued {} credentials for payment {}",
            plan.plan_type, transaction.reference
        );

        self.notify(email, &plan.plan_type, &transaction.reference, &credentials)
            .await;

        Ok(IssuedCredentials {
            credentials,
            reference: transaction.reference.clone(),
            plan_type: plan.plan_type,
            already_processed: false,
        })
    }

    /// Email delivery never fails the request; the login is already allocated
    async fn notify(&self, email: &str, plan_type: &str, reference: &str, credentials: &Credentials) {
        if let Err(e) = self
            .email
            .send_credentials_email(email, plan_type, reference, credentials)
            .await
        {
            error!("Failed to email credentials for {}: {}", reference, e);
        }
    }
}
