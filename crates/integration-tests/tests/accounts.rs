//! Health, registration, login and profile against a running server.
//!
//! Run with: cargo test -p emporium-integration-tests -- --ignored

#![allow(clippy::expect_used)]

use emporium_integration_tests::{
    CUSTOMER_PASSWORD, TestContext, client_ip, expect_status, unique_email,
};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires a running Emporium API"]
async fn test_health_and_readiness() {
    let ctx = TestContext::new();

    let response = ctx
        .client
        .get(ctx.url("/health"))
        .send()
        .await
        .expect("Failed to call /health");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let response = ctx
        .client
        .get(ctx.url("/health/ready"))
        .send()
        .await
        .expect("Failed to call /health/ready");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires a running Emporium API"]
async fn test_register_login_and_profile() {
    let ctx = TestContext::new();
    let email = unique_email("profile");
    let ip = client_ip();

    let response = ctx
        .user(Method::POST, "/auth/register", None)
        .header("x-forwarded-for", &ip)
        .json(&json!({ "email": email, "password": CUSTOMER_PASSWORD }))
        .send()
        .await
        .expect("Failed to register");
    let registered = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(registered["token_type"], "Bearer");
    assert_eq!(registered["user"]["role"]["code"], "customer");

    // Same address again, differently cased
    let response = ctx
        .user(Method::POST, "/auth/register", None)
        .header("x-forwarded-for", &ip)
        .json(&json!({ "email": email.to_uppercase(), "password": CUSTOMER_PASSWORD }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .user(Method::POST, "/auth/login", None)
        .header("x-forwarded-for", &ip)
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .user(Method::POST, "/auth/login", None)
        .header("x-forwarded-for", &ip)
        .json(&json!({ "email": email, "password": CUSTOMER_PASSWORD }))
        .send()
        .await
        .expect("Failed to log in");
    let login = expect_status(response, StatusCode::OK).await;
    let token = login["token"].as_str().expect("token");

    let response = ctx
        .user(Method::PUT, "/profile", Some(token))
        .json(&json!({ "first_name": "Ada", "last_name": "Lovelace" }))
        .send()
        .await
        .expect("Failed to update profile");
    let profile = expect_status(response, StatusCode::OK).await;
    assert_eq!(profile["first_name"], "Ada");

    let response = ctx
        .user(Method::GET, "/profile", Some(token))
        .send()
        .await
        .expect("Failed to get profile");
    let profile = expect_status(response, StatusCode::OK).await;
    assert_eq!(profile["last_name"], "Lovelace");
    assert_eq!(profile["email"], email);
}

#[tokio::test]
#[ignore = "Requires a running Emporium API"]
async fn test_first_address_becomes_default() {
    let ctx = TestContext::new();
    let token = ctx.register_customer().await;

    let first = ctx.create_address(&token).await;
    let second = ctx.create_address(&token).await;

    let response = ctx
        .user(Method::GET, "/addresses", Some(&token))
        .send()
        .await
        .expect("Failed to list addresses");
    let addresses = expect_status(response, StatusCode::OK).await;
    let defaults: Vec<i64> = addresses
        .as_array()
        .expect("address list")
        .iter()
        .filter(|a| a["is_default"] == true)
        .filter_map(|a| a["id"].as_i64())
        .collect();
    assert_eq!(defaults, vec![first]);

    let response = ctx
        .user(Method::PUT, &format!("/addresses/{second}/default"), Some(&token))
        .send()
        .await
        .expect("Failed to set default address");
    let address = expect_status(response, StatusCode::OK).await;
    assert_eq!(address["is_default"], true);
}

#[tokio::test]
#[ignore = "Requires a running Emporium API"]
async fn test_customer_cannot_use_admin_api() {
    let ctx = TestContext::new();
    let token = ctx.register_customer().await;

    let response = ctx
        .admin(Method::GET, "/users", &token)
        .send()
        .await
        .expect("Failed to call admin API");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
