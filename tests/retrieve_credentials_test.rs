mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{mock_email_delivery, setup_test_app, setup_test_app_with, TEST_EMAIL};
use serde_json::{json, Value};

#[tokio::test]
async fn test_retrieve_credentials_for_recorded_payment() {
    let app = setup_test_app().await;
    app.store
        .record_payment("daily-80", TEST_EMAIL, "daily", "flint-user1", "s3cret", Utc::now());
    let mail = mock_email_delivery(&app.mail).await;

    let response = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "reference": "daily-80", "email": " AMA@Example.com " }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "credentials": { "username": "flint-user1", "password": "s3cret" },
            "reference": "daily-80",
            "planType": "daily"
        })
    );
    mail.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_retrieve_credentials_can_resend_email() {
    let app = setup_test_app().await;
    app.store
        .record_payment("daily-81", TEST_EMAIL, "daily", "flint-user1", "s3cret", Utc::now());
    let mail = mock_email_delivery(&app.mail).await;

    let response = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "reference": "daily-81", "email": TEST_EMAIL, "resendEmail": true }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    mail.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_retrieve_credentials_wrong_email_is_not_found() {
    let app = setup_test_app().await;
    app.store
        .record_payment("daily-82", TEST_EMAIL, "daily", "flint-user1", "s3cret", Utc::now());

    let response = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "reference": "daily-82", "email": "kofi@example.com" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await;
    assert_eq!(body["error"], "No credentials found for this payment");
}

#[tokio::test]
async fn test_retrieve_credentials_unknown_reference() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "reference": "daily-404", "email": TEST_EMAIL }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retrieve_credentials_validates_input() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "reference": "daily-80", "email": "nope" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "email": TEST_EMAIL }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_retrieve_credentials_is_rate_limited() {
    let app = setup_test_app_with(|config| config.security.lookup_rate_limit_per_minute = 1).await;

    let first = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "reference": "daily-1", "email": TEST_EMAIL }))
        .with_ip("10.2.2.2:5000")
        .send()
        .await;
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = app
        .post("/api/retrieve-credentials")
        .json(&json!({ "reference": "daily-2", "email": TEST_EMAIL }))
        .with_ip("10.2.2.2:5000")
        .send()
        .await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_for_is_used_when_trusted() {
    let app = setup_test_app_with(|config| {
        config.security.lookup_rate_limit_per_minute = 1;
        config.security.trust_forwarded_for = true;
    })
    .await;

    for client in ["198.51.100.1", "198.51.100.2"] {
        let response = app
            .post("/api/retrieve-credentials")
            .json(&json!({ "reference": "daily-1", "email": TEST_EMAIL }))
            .header("x-forwarded-for", client)
            .with_ip("10.0.0.1:80")
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
