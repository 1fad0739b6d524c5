// Services module for Flint WiFi Backend
// Business logic layer for the application

pub mod email;
pub mod issuance;
pub mod paystack;
pub mod store;

// Re-export commonly used services
pub use email::{EmailError, EmailService};
pub use issuance::{IssuanceError, IssuanceService, IssuedCredentials, ManualOutcome};
pub use paystack::{PaystackClient, PaystackError};
pub use store::{Allocation, CredentialStore, IssueRequest, PgCredentialStore, StoreError};
