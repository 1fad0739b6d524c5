// Common test utilities and helper structs
// Shared across all test files to avoid duplication
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use flint_wifi_backend::{
    app::AppState,
    app_config::{
        AppConfig, DatabaseConfig, EmailConfig, Environment, FeatureConfig, PaystackConfig,
        RecoveryConfig, SecurityConfig, ServerConfig,
    },
    build_router,
    models::{Credentials, Plan, Transaction},
    services::{Allocation, CredentialStore, IssueRequest, StoreError},
};
use httpmock::{Method::POST, Mock, MockServer};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_EMAIL: &str = "ama@example.com";

// =============================================================================
// IN-MEMORY CREDENTIAL STORE
// =============================================================================

struct StoredLogin {
    id: Uuid,
    plan_type: String,
    credentials: Credentials,
    is_assigned: bool,
}

#[derive(Default)]
struct StoreState {
    plans: Vec<Plan>,
    logins: Vec<StoredLogin>,
    transactions: Vec<Transaction>,
    failing: bool,
    stale_lookups: bool,
}

/// Mirrors `process_transaction_and_delete_login` without a database
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// daily 4, weekly 25, monthly 100
    pub fn with_default_plans() -> Self {
        let store = Self::default();
        store.add_plan("monthly", 100, true);
        store.add_plan("daily", 4, true);
        store.add_plan("weekly", 25, true);
        store
    }

    pub fn add_plan(&self, plan_type: &str, amount: i32, enabled: bool) {
        self.state.lock().unwrap().plans.push(Plan {
            plan_type: plan_type.to_string(),
            amount,
            description: Some(format!("{} access", plan_type)),
            enabled,
            created_at: Utc::now(),
        });
    }

    pub fn add_login(&self, plan_type: &str, username: &str, password: &str) {
        self.state.lock().unwrap().logins.push(StoredLogin {
            id: Uuid::new_v4(),
            plan_type: plan_type.to_string(),
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
            is_assigned: false,
        });
    }

    /// Record an already-processed payment, allocating a fresh login for it
    pub fn record_payment(
        &self,
        reference: &str,
        email: &str,
        plan_type: &str,
        username: &str,
        password: &str,
        created_at: DateTime<Utc>,
    ) {
        let mut state = self.state.lock().unwrap();
        let login_id = Uuid::new_v4();
        state.logins.push(StoredLogin {
            id: login_id,
            plan_type: plan_type.to_string(),
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
            is_assigned: true,
        });
        state.transactions.push(Transaction {
            id: Uuid::new_v4(),
            payment_reference: reference.to_string(),
            customer_email: email.to_string(),
            plan_type: plan_type.to_string(),
            amount: 400,
            login_id,
            created_at,
        });
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Make `find_transaction` miss recorded payments, as a request that read
    /// before a concurrent allocation committed would
    pub fn set_stale_lookups(&self, stale: bool) {
        self.state.lock().unwrap().stale_lookups = stale;
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().unwrap().transactions.len()
    }

    pub fn available_logins(&self, plan_type: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .logins
            .iter()
            .filter(|l| l.plan_type == plan_type && !l.is_assigned)
            .count()
    }

    fn check(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        Ok(state)
    }
}

fn credentials_for(state: &StoreState, login_id: Uuid) -> Option<Credentials> {
    state
        .logins
        .iter()
        .find(|l| l.id == login_id)
        .map(|l| l.credentials.clone())
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn list_plans(&self) -> Result<Vec<Plan>, StoreError> {
        let mut plans = self.check()?.plans.clone();
        plans.sort_by_key(|p| p.amount);
        Ok(plans)
    }

    async fn find_plan(&self, plan_type: &str) -> Result<Option<Plan>, StoreError> {
        Ok(self
            .check()?
            .plans
            .iter()
            .find(|p| p.plan_type == plan_type)
            .cloned())
    }

    async fn find_transaction(&self, reference: &str) -> Result<Option<Transaction>, StoreError> {
        let state = self.check()?;
        if state.stale_lookups {
            return Ok(None);
        }
        Ok(state
            .transactions
            .iter()
            .find(|t| t.payment_reference == reference)
            .cloned())
    }

    async fn find_recent_transaction(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .check()?
            .transactions
            .iter()
            .filter(|t| t.customer_email.eq_ignore_ascii_case(email) && t.created_at >= since)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn issue_credentials(&self, request: &IssueRequest) -> Result<Allocation, StoreError> {
        let mut state = self.check()?;

        if let Some(existing) = state
            .transactions
            .iter()
            .find(|t| t.payment_reference == request.reference)
        {
            if !existing.customer_email.eq_ignore_ascii_case(&request.email) {
                return Ok(Allocation::ClaimedByOther);
            }
            return Ok(credentials_for(&state, existing.login_id)
                .map(Allocation::Replayed)
                .unwrap_or(Allocation::ClaimedByOther));
        }

        let Some(login) = state
            .logins
            .iter_mut()
            .find(|l| l.plan_type == request.plan_type && !l.is_assigned)
        else {
            return Ok(Allocation::OutOfStock);
        };

        login.is_assigned = true;
        let login_id = login.id;
        let credentials = login.credentials.clone();

        state.transactions.push(Transaction {
            id: Uuid::new_v4(),
            payment_reference: request.reference.clone(),
            customer_email: request.email.clone(),
            plan_type: request.plan_type.clone(),
            amount: request.amount,
            login_id,
            created_at: Utc::now(),
        });

        Ok(Allocation::Issued(credentials))
    }

    async fn find_credentials(
        &self,
        reference: &str,
        email: &str,
    ) -> Result<Option<(Transaction, Credentials)>, StoreError> {
        let state = self.check()?;
        let found = state
            .transactions
            .iter()
            .find(|t| {
                t.payment_reference == reference && t.customer_email.eq_ignore_ascii_case(email)
            })
            .and_then(|t| credentials_for(&state, t.login_id).map(|c| (t.clone(), c)));
        Ok(found)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check().map(|_| ())
    }
}

// =============================================================================
// PAYSTACK FIXTURES
// =============================================================================

/// A Paystack transaction object
pub fn paystack_transaction(reference: &str, status: &str, amount: i64, email: &str) -> Value {
    json!({
        "id": 1001,
        "reference": reference,
        "status": status,
        "amount": amount,
        "currency": "GHS",
        "paid_at": Utc::now().to_rfc3339(),
        "created_at": Utc::now().to_rfc3339(),
        "metadata": { "plan_type": plan_from_reference(reference), "custom_reference": reference },
        "customer": { "id": 77, "email": email, "customer_code": "CUS_test" }
    })
}

fn plan_from_reference(reference: &str) -> &str {
    reference.rsplit_once('-').map(|(plan, _)| plan).unwrap_or(reference)
}

/// Mock `GET /transaction/verify/:reference` returning `transaction`
pub async fn mock_verify<'a>(server: &'a MockServer, reference: &str, transaction: Value) -> Mock<'a> {
    let path = format!("/transaction/verify/{}", reference);
    server
        .mock_async(|when, then| {
            when.method(httpmock::Method::GET).path(path);
            then.status(200).json_body(json!({
                "status": true,
                "message": "Verification successful",
                "data": transaction
            }));
        })
        .await
}

/// Mock a successful Resend delivery
pub async fn mock_email_delivery(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/emails");
            then.status(200).json_body(json!({ "id": "email_test" }));
        })
        .await
}

// =============================================================================
// TEST APPLICATION
// =============================================================================

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub store: Arc<InMemoryStore>,
    pub paystack: MockServer,
    pub mail: MockServer,
}

impl TestApp {
    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    /// Send an OPTIONS request
    pub fn options(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "OPTIONS", uri)
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    request: Request<Body>,
    custom_ip: Option<String>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        Self {
            app,
            request,
            custom_ip: None,
        }
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(self, body: &T) -> Self {
        let body_bytes = serde_json::to_vec(body).unwrap();
        self.raw_json(body_bytes)
    }

    /// Send an arbitrary body with a JSON content type
    pub fn raw_json(mut self, body: impl Into<Body>) -> Self {
        let (mut parts, _) = self.request.into_parts();
        parts
            .headers
            .insert("content-type", "application/json".parse().unwrap());
        self.request = Request::from_parts(parts, body.into());
        self
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.request
            .headers_mut()
            .insert(name, value.parse().unwrap());
        self
    }

    /// Set a custom IP address for this request (useful for rate limiting tests)
    pub fn with_ip(mut self, ip: &str) -> Self {
        self.custom_ip = Some(ip.to_string());
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let mut request = self.request;

        // Use a random IP unless one was given, so rate limits don't leak across requests
        let ip_address = self.custom_ip.unwrap_or_else(|| {
            format!(
                "127.0.{}.{}:12345",
                rand::random::<u8>(),
                rand::random::<u8>().saturating_add(1)
            )
        });

        request
            .extensions_mut()
            .insert(ConnectInfo(ip_address.parse::<SocketAddr>().unwrap()));

        let response = self.app.app.clone().oneshot(request).await.unwrap();

        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Get response body as text
    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

/// Configuration pointing every outbound call at the mock servers
pub fn test_config(paystack: &MockServer, mail: &MockServer) -> AppConfig {
    AppConfig {
        environment: Environment::Test,
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            public_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string(),
            public_base_url: "http://localhost:3000".to_string(),
        },
        database: DatabaseConfig {
            url: "postgresql://unused@localhost/unused".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: 1,
            idle_timeout: 60,
            max_lifetime: 60,
            disable_embedded_migrations: true,
        },
        paystack: PaystackConfig {
            secret_key: "sk_test_secret".to_string(),
            public_key: "pk_test_public".to_string(),
            split_code: None,
            api_url: paystack.base_url(),
            currency: "GHS".to_string(),
            timeout_secs: 5,
        },
        email: EmailConfig {
            resend_api_key: "re_test_key".to_string(),
            resend_api_url: mail.url("/emails"),
            from_email: "noreply@flintwifi.test".to_string(),
            from_name: "Flint WiFi".to_string(),
            support_email: "support@flintwifi.test".to_string(),
            max_retries: 2,
            retry_delay_ms: 1,
            timeout_secs: 2,
            delivery_timeout_secs: 3,
        },
        recovery: RecoveryConfig {
            lookback_days: 2,
            transaction_limit: 3,
        },
        security: SecurityConfig {
            cors_allowed_origins: vec!["*".to_string()],
            lookup_rate_limit_per_minute: 100,
            trust_forwarded_for: false,
        },
        features: FeatureConfig {
            enable_rate_limiting: true,
            enable_api_docs: true,
        },
    }
}

/// Setup test application backed by the in-memory store and mock servers
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Same as `setup_test_app`, with a hook to adjust the configuration
pub async fn setup_test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let paystack = MockServer::start_async().await;
    let mail = MockServer::start_async().await;

    let mut config = test_config(&paystack, &mail);
    configure(&mut config);

    let store = Arc::new(InMemoryStore::with_default_plans());
    let state = AppState::new(config, store.clone()).unwrap();

    TestApp {
        app: build_router(state),
        store,
        paystack,
        mail,
    }
}
