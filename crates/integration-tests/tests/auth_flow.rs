//! Registration, login and password reset over HTTP.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use sundry_core::VerificationPurpose;
use sundry_integration_tests::{TEST_PASSWORD, TestApp, json_body};

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let app = TestApp::spawn().await;
    app.register("jane.doe@shop.test").await;

    let body = app.login("jane.doe@shop.test", TEST_PASSWORD).await;
    assert_eq!(body["display_name"], "jane.doe");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

#[tokio::test]
async fn test_register_reports_missing_fields() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/register", &json!({ "email": "a@shop.test" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["message"],
        "Missing required fields: password, code"
    );
}

#[tokio::test]
async fn test_register_checks_email_before_password() {
    let app = TestApp::spawn().await;

    let resp = app
        .post(
            "/register",
            &json!({ "email": "nope", "password": "weak", "code": "123456" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["message"], "Invalid email format");
}

#[tokio::test]
async fn test_register_rejects_weak_password_without_burning_code() {
    let app = TestApp::spawn().await;
    let code = app
        .request_code("weak@shop.test", VerificationPurpose::Registration)
        .await;

    let resp = app
        .post(
            "/register",
            &json!({ "email": "weak@shop.test", "password": "abcdefg", "code": code }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post(
            "/register",
            &json!({ "email": "weak@shop.test", "password": TEST_PASSWORD, "code": code }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_register_with_wrong_code_keeps_real_code() {
    let app = TestApp::spawn().await;
    let code = app
        .request_code("retry@shop.test", VerificationPurpose::Registration)
        .await;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let resp = app
        .post(
            "/register",
            &json!({ "email": "retry@shop.test", "password": TEST_PASSWORD, "code": wrong }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["message"],
        "Verification code is incorrect"
    );

    let resp = app
        .post(
            "/register",
            &json!({ "email": "retry@shop.test", "password": TEST_PASSWORD, "verification_code": code }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_register_code_expires_after_five_minutes() {
    let app = TestApp::spawn().await;
    let code = app
        .request_code("late@shop.test", VerificationPurpose::Registration)
        .await;

    app.clock.advance(Duration::from_secs(300));

    let resp = app
        .post(
            "/register",
            &json!({ "email": "late@shop.test", "password": TEST_PASSWORD, "code": code }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["message"],
        "Verification code is missing or expired"
    );
}

#[tokio::test]
async fn test_register_twice_conflicts() {
    let app = TestApp::spawn().await;
    app.register("dup@shop.test").await;

    let code = app
        .request_code("dup@shop.test", VerificationPurpose::Registration)
        .await;
    let resp = app
        .post(
            "/register",
            &json!({ "email": "dup@shop.test", "password": TEST_PASSWORD, "code": code }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["message"],
        "This email is already registered"
    );
}

#[tokio::test]
async fn test_registration_code_does_not_reset_password() {
    let app = TestApp::spawn().await;
    app.register("mix@shop.test").await;
    let code = app
        .request_code("mix@shop.test", VerificationPurpose::Registration)
        .await;

    let resp = app
        .post(
            "/reset_password",
            &json!({ "email": "mix@shop.test", "code": code, "password": "newpass123" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::spawn().await;
    app.register("login@shop.test").await;

    for body in [
        json!({ "email": "login@shop.test", "password": "wrongpass1" }),
        json!({ "email": "nobody@shop.test", "password": TEST_PASSWORD }),
        json!({}),
    ] {
        let resp = app.post("/login", &body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["message"].as_str().is_some());
}

// ============================================================================
// Verification Codes
// ============================================================================

#[tokio::test]
async fn test_send_code_for_unknown_email_succeeds() {
    let app = TestApp::spawn().await;

    let resp = app
        .post("/send_verification_code", &json!({ "email": "ghost@shop.test" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["message"], "Verification code sent");

    // Password reset is the default purpose.
    let code = app
        .delivery
        .last_code("ghost@shop.test", VerificationPurpose::PasswordReset)
        .unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn test_send_code_validation() {
    let app = TestApp::spawn().await;

    let resp = app.post("/send_verification_code", &json!({})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .post(
            "/send_verification_code",
            &json!({ "email": "a@shop.test", "purpose": "newsletter" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(app.delivery.all().is_empty());
}

// ============================================================================
// Password Reset
// ============================================================================

#[tokio::test]
async fn test_reset_password_flow() {
    let app = TestApp::spawn().await;
    app.register("reset@shop.test").await;

    let code = app
        .request_code("reset@shop.test", VerificationPurpose::PasswordReset)
        .await;
    let resp = app
        .post(
            "/reset_password",
            &json!({ "email": "reset@shop.test", "code": code, "password": "brandnew42" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["message"], "Password reset successful");

    app.login("reset@shop.test", "brandnew42").await;
    let resp = app
        .post(
            "/login",
            &json!({ "email": "reset@shop.test", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // The code was used up.
    let resp = app
        .post(
            "/reset_password",
            &json!({ "email": "reset@shop.test", "code": code, "password": "another42" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_for_unknown_user_burns_code() {
    let app = TestApp::spawn().await;
    let code = app
        .request_code("ghost@shop.test", VerificationPurpose::PasswordReset)
        .await;

    let resp = app
        .post(
            "/reset_password",
            &json!({ "email": "ghost@shop.test", "code": code, "password": "brandnew42" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["message"], "User not found");

    let resp = app
        .post(
            "/reset_password",
            &json!({ "email": "ghost@shop.test", "code": code, "password": "brandnew42" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["message"],
        "Verification code is missing or expired"
    );
}

#[tokio::test]
async fn test_reset_rejects_weak_password() {
    let app = TestApp::spawn().await;
    app.register("weakreset@shop.test").await;
    let code = app
        .request_code("weakreset@shop.test", VerificationPurpose::PasswordReset)
        .await;

    let resp = app
        .post(
            "/reset_password",
            &json!({ "email": "weakreset@shop.test", "code": code, "password": "1234567" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["message"],
        "Password must be at least 8 characters and contain both letters and digits"
    );
}

#[tokio::test]
async fn test_trailing_slash_is_accepted() {
    let app = TestApp::spawn().await;

    let resp = app
        .post(
            "/send_verification_code/",
            &json!({ "email": "slash@shop.test" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}
