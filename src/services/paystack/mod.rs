// Paystack payment gateway integration

pub mod client;
pub mod types;

pub use client::PaystackClient;
pub use types::{PaystackCustomer, PaystackEnvelope, PaystackError, PaystackTransaction};
