//! Checkout, cancellation and discounts against a running server.
//!
//! Needs an admin account, see the crate docs.

#![allow(clippy::expect_used, clippy::float_cmp)]

use emporium_integration_tests::{TestContext, amount, expect_status, id_of, unique_code};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
#[ignore = "Requires a running Emporium API and admin credentials"]
async fn test_checkout_reserves_and_cancel_restores_stock() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let (_, item_id) = ctx.create_stocked_item(&admin, "50.00", 3).await;

    let customer = ctx.register_customer().await;
    let address_id = ctx.create_address(&customer).await;

    let response = ctx
        .user(Method::POST, "/orders/preview", Some(&customer))
        .json(&json!({ "items": [{ "product_item_id": item_id, "quantity": 2 }] }))
        .send()
        .await
        .expect("Failed to preview");
    let quote = expect_status(response, StatusCode::OK).await;
    assert_eq!(amount(&quote["subtotal"]), 100.0);
    assert_eq!(
        amount(&quote["total"]),
        100.0 + amount(&quote["shipping_cost"])
    );
    // Preview reserves nothing
    assert_eq!(ctx.item_stock(&admin, item_id).await, 3);

    let response = ctx
        .user(Method::POST, "/orders", Some(&customer))
        .json(&json!({
            "address_id": address_id,
            "items": [{ "product_item_id": item_id, "quantity": 2 }],
        }))
        .send()
        .await
        .expect("Failed to check out");
    let order = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"][0]["quantity"], 2);
    let order_id = id_of(&order);
    assert_eq!(ctx.item_stock(&admin, item_id).await, 1);

    let response = ctx
        .user(Method::POST, "/orders", Some(&customer))
        .json(&json!({
            "address_id": address_id,
            "items": [{ "product_item_id": item_id, "quantity": 2 }],
        }))
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.item_stock(&admin, item_id).await, 1);

    let response = ctx
        .user(Method::POST, &format!("/orders/{order_id}/cancel"), Some(&customer))
        .send()
        .await
        .expect("Failed to cancel");
    let cancelled = expect_status(response, StatusCode::OK).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(ctx.item_stock(&admin, item_id).await, 3);

    let response = ctx
        .user(Method::POST, &format!("/orders/{order_id}/cancel"), Some(&customer))
        .send()
        .await
        .expect("Failed to cancel");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running Emporium API and admin credentials"]
async fn test_orders_are_private_to_their_owner() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let (_, item_id) = ctx.create_stocked_item(&admin, "10.00", 5).await;

    let owner = ctx.register_customer().await;
    let address_id = ctx.create_address(&owner).await;
    let response = ctx
        .user(Method::POST, "/orders", Some(&owner))
        .json(&json!({
            "address_id": address_id,
            "items": [{ "product_item_id": item_id, "quantity": 1 }],
        }))
        .send()
        .await
        .expect("Failed to check out");
    let order_id = id_of(&expect_status(response, StatusCode::CREATED).await);

    let stranger = ctx.register_customer().await;
    let response = ctx
        .user(Method::GET, &format!("/orders/{order_id}"), Some(&stranger))
        .send()
        .await
        .expect("Failed to get order");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Someone else's address cannot be shipped to
    let response = ctx
        .user(Method::POST, "/orders", Some(&stranger))
        .json(&json!({
            "address_id": address_id,
            "items": [{ "product_item_id": item_id, "quantity": 1 }],
        }))
        .send()
        .await
        .expect("Failed to check out");
    let body = expect_status(response, StatusCode::UNPROCESSABLE_ENTITY).await;
    assert!(body["errors"]["address_id"].is_array());
}

#[tokio::test]
#[ignore = "Requires a running Emporium API and admin credentials"]
async fn test_admin_status_changes_follow_lifecycle() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let (_, item_id) = ctx.create_stocked_item(&admin, "25.00", 2).await;

    let customer = ctx.register_customer().await;
    let address_id = ctx.create_address(&customer).await;
    let response = ctx
        .user(Method::POST, "/orders", Some(&customer))
        .json(&json!({
            "address_id": address_id,
            "items": [{ "product_item_id": item_id, "quantity": 1 }],
        }))
        .send()
        .await
        .expect("Failed to check out");
    let order_id = id_of(&expect_status(response, StatusCode::CREATED).await);

    for status in ["paid", "shipped"] {
        let response = ctx
            .admin(Method::PUT, &format!("/orders/{order_id}/status"), &admin)
            .json(&json!({ "status": status }))
            .send()
            .await
            .expect("Failed to change status");
        let order = expect_status(response, StatusCode::OK).await;
        assert_eq!(order["status"], status);
    }

    // Shipped orders can no longer be cancelled
    let response = ctx
        .admin(Method::PUT, &format!("/orders/{order_id}/status"), &admin)
        .json(&json!({ "status": "cancelled" }))
        .send()
        .await
        .expect("Failed to change status");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .user(Method::POST, &format!("/orders/{order_id}/cancel"), Some(&customer))
        .send()
        .await
        .expect("Failed to cancel");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a running Emporium API and admin credentials"]
async fn test_discount_applies_at_checkout() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let (_, item_id) = ctx.create_stocked_item(&admin, "40.00", 5).await;
    let code = format!("save-{}", unique_code());

    let response = ctx
        .admin(Method::POST, "/discounts", &admin)
        .json(&json!({
            "code": code,
            "kind": "percent",
            "value": "25",
            "min_order_amount": "50",
            "usage_limit": 1,
        }))
        .send()
        .await
        .expect("Failed to create discount");
    let discount = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(discount["code"], code.to_uppercase());

    let customer = ctx.register_customer().await;

    // Below the minimum order amount
    let response = ctx
        .user(Method::POST, "/discounts/validate", Some(&customer))
        .json(&json!({ "code": code, "subtotal": "40.00" }))
        .send()
        .await
        .expect("Failed to validate discount");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .user(Method::POST, "/discounts/validate", Some(&customer))
        .json(&json!({ "code": code, "subtotal": "80.00" }))
        .send()
        .await
        .expect("Failed to validate discount");
    let check = expect_status(response, StatusCode::OK).await;
    assert_eq!(amount(&check["discount_amount"]), 20.0);

    let address_id = ctx.create_address(&customer).await;
    let response = ctx
        .user(Method::POST, "/orders", Some(&customer))
        .json(&json!({
            "address_id": address_id,
            "items": [{ "product_item_id": item_id, "quantity": 2 }],
            "discount_code": code,
        }))
        .send()
        .await
        .expect("Failed to check out");
    let order = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(amount(&order["discount_amount"]), 20.0);
    assert_eq!(
        amount(&order["total"]),
        60.0 + amount(&order["shipping_cost"])
    );

    // Usage limit reached
    let response = ctx
        .user(Method::POST, "/orders", Some(&customer))
        .json(&json!({
            "address_id": address_id,
            "items": [{ "product_item_id": item_id, "quantity": 2 }],
            "discount_code": code,
        }))
        .send()
        .await
        .expect("Failed to check out");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
