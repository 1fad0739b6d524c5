// Utility modules for Flint WiFi Backend

pub mod reference;
pub mod service_error;
pub mod validation;

pub use reference::{generate_reference, plan_type_from_reference};
pub use service_error::ApiError;
pub use validation::{emails_match, trim_optional_field};
