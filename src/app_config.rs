// Centralized configuration management for Flint WiFi Backend
// Load ALL env vars ONCE at startup

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // For tests, load .env file first
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub paystack: PaystackConfig,
    pub email: EmailConfig,
    pub recovery: RecoveryConfig,
    pub security: SecurityConfig,
    pub features: FeatureConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Directory holding the storefront pages and scripts
    pub public_dir: String,
    /// Absolute URL of the storefront, used in emails
    pub public_base_url: String,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    pub max_lifetime: u64,
    pub disable_embedded_migrations: bool,
}

/// Paystack gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub public_key: String,
    pub split_code: Option<String>,
    pub api_url: String,
    pub currency: String,
    pub timeout_secs: u64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub resend_api_key: String,
    pub resend_api_url: String,
    pub from_email: String,
    pub from_name: String,
    pub support_email: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Per-request timeout against the mail API
    pub timeout_secs: u64,
    /// Upper bound on one delivery including every retry
    pub delivery_timeout_secs: u64,
}

/// Manual payment recovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Only payments made within this many days are recovered
    pub lookback_days: i64,
    /// How many of the customer's latest transactions are inspected
    pub transaction_limit: u32,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_allowed_origins: Vec<String>,
    pub lookup_rate_limit_per_minute: u32,
    /// Take the client IP from X-Forwarded-For (only behind a trusted proxy)
    pub trust_forwarded_for: bool,
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_rate_limiting: bool,
    pub enable_api_docs: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Helper function to get required env var
        let get_required = |key: &str| -> Result<String, ConfigError> {
            match env::var(key) {
                Ok(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingVar(key.to_string())),
            }
        };

        // Helper function to get optional env var with default
        let get_or_default = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let parse_or_default = |key: &str, default: &str| -> Result<u32, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
            })
        };

        let parse_u64_or_default = |key: &str, default: &str| -> Result<u64, ConfigError> {
            get_or_default(key, default).parse().map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
            })
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        // Port of the bind address seeds the default public URL
        let bind_address = get_or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let port = bind_address
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let server = ServerConfig {
            bind_address: bind_address.clone(),
            public_dir: get_or_default("PUBLIC_DIR", "public"),
            public_base_url: get_or_default(
                "PUBLIC_BASE_URL",
                &format!("http://localhost:{}", port),
            ),
        };

        let database = DatabaseConfig {
            url: get_required("DATABASE_URL")?,
            max_connections: parse_or_default("DATABASE_MAX_CONNECTIONS", "10")?,
            min_connections: parse_or_default("DATABASE_MIN_CONNECTIONS", "1")?,
            connect_timeout: parse_u64_or_default("DATABASE_CONNECT_TIMEOUT", "30")?,
            idle_timeout: parse_u64_or_default("DATABASE_IDLE_TIMEOUT", "600")?,
            max_lifetime: parse_u64_or_default("DATABASE_MAX_LIFETIME", "1800")?,
            disable_embedded_migrations: parse_bool_or_default(
                "DISABLE_EMBEDDED_MIGRATIONS",
                "false",
            ),
        };

        if database.max_connections < database.min_connections {
            return Err(ConfigError::InvalidValue(
                "DATABASE_MAX_CONNECTIONS".to_string(),
                "must be >= DATABASE_MIN_CONNECTIONS".to_string(),
            ));
        }

        let paystack = PaystackConfig {
            secret_key: get_required("PAYSTACK_SECRET_KEY")?,
            public_key: get_required("PAYSTACK_PUBLIC_KEY")?,
            split_code: env::var("PAYSTACK_SPLIT_CODE")
                .ok()
                .filter(|code| !code.trim().is_empty()),
            api_url: get_or_default("PAYSTACK_API_URL", "https://api.paystack.co")
                .trim_end_matches('/')
                .to_string(),
            currency: get_or_default("PAYSTACK_CURRENCY", "GHS"),
            timeout_secs: parse_u64_or_default("PAYSTACK_TIMEOUT_SECS", "15")?,
        };

        // Live keys in anything but production are almost always a mistake
        if environment != Environment::Production && paystack.secret_key.starts_with("sk_live_") {
            tracing::warn!("Live Paystack secret key configured in {} environment", environment);
        }

        let email = EmailConfig {
            resend_api_key: get_required("RESEND_API_KEY")?,
            resend_api_url: get_or_default("RESEND_API_URL", "https://api.resend.com/emails"),
            from_email: get_or_default("EMAIL_FROM", "noreply@flintwifi.com"),
            from_name: get_or_default("EMAIL_FROM_NAME", "Flint WiFi"),
            support_email: get_or_default("SUPPORT_EMAIL", "support@flintwifi.com"),
            max_retries: parse_or_default("EMAIL_MAX_RETRIES", "3")?.max(1),
            retry_delay_ms: parse_u64_or_default("EMAIL_RETRY_DELAY_MS", "1000")?,
            timeout_secs: parse_u64_or_default("EMAIL_TIMEOUT_SECS", "10")?.max(1),
            delivery_timeout_secs: parse_u64_or_default("EMAIL_DELIVERY_TIMEOUT_SECS", "30")?
                .max(1),
        };

        let recovery = RecoveryConfig {
            lookback_days: parse_or_default("MANUAL_VERIFY_LOOKBACK_DAYS", "2")? as i64,
            transaction_limit: parse_or_default("MANUAL_VERIFY_TRANSACTION_LIMIT", "3")?.max(1),
        };

        let security = SecurityConfig {
            cors_allowed_origins: get_or_default("CORS_ALLOWED_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            lookup_rate_limit_per_minute: parse_or_default("LOOKUP_RATE_LIMIT_PER_MINUTE", "10")?
                .max(1),
            trust_forwarded_for: parse_bool_or_default("TRUST_FORWARDED_FOR", "false"),
        };

        let features = FeatureConfig {
            enable_rate_limiting: parse_bool_or_default("ENABLE_RATE_LIMITING", "true"),
            enable_api_docs: parse_bool_or_default("ENABLE_API_DOCS", "false"),
        };

        Ok(Self {
            environment,
            server,
            database,
            paystack,
            email,
            recovery,
            security,
            features,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Get the global configuration instance
/// This is the primary way to access configuration throughout the app
pub fn config() -> &'static AppConfig {
    &CONFIG
}
