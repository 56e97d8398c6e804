//! Catalog visibility, comments and favorites against a running server.

#![allow(clippy::expect_used)]

use emporium_integration_tests::{TestContext, expect_status};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires a running Emporium API and admin credentials"]
async fn test_inactive_products_are_hidden() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let (product_id, _) = ctx.create_stocked_item(&admin, "12.50", 4).await;

    let response = ctx
        .user(Method::GET, &format!("/products/{product_id}"), None)
        .send()
        .await
        .expect("Failed to get product");
    let product = expect_status(response, StatusCode::OK).await;
    assert_eq!(product["items"].as_array().map(Vec::len), Some(1));

    let response = ctx
        .admin(Method::GET, &format!("/products/{product_id}"), &admin)
        .send()
        .await
        .expect("Failed to get product");
    let detail = expect_status(response, StatusCode::OK).await;
    let response = ctx
        .admin(Method::PUT, &format!("/products/{product_id}"), &admin)
        .json(&json!({
            "name": detail["name"],
            "code": detail["code"],
            "brand_id": detail["brand_id"],
            "category_id": detail["category_id"],
            "is_active": false,
        }))
        .send()
        .await
        .expect("Failed to update product");
    expect_status(response, StatusCode::OK).await;

    let response = ctx
        .user(Method::GET, &format!("/products/{product_id}"), None)
        .send()
        .await
        .expect("Failed to get product");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let customer = ctx.register_customer().await;
    let response = ctx
        .user(Method::PUT, &format!("/favorites/{product_id}"), Some(&customer))
        .send()
        .await
        .expect("Failed to add favorite");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires a running Emporium API and admin credentials"]
async fn test_comment_visible_once_approved() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let (product_id, _) = ctx.create_stocked_item(&admin, "30.00", 1).await;
    let customer = ctx.register_customer().await;

    let response = ctx
        .user(Method::POST, "/comments", Some(&customer))
        .json(&json!({ "product_id": product_id, "body": "Sturdy and light.", "rating": 4 }))
        .send()
        .await
        .expect("Failed to comment");
    let comment = expect_status(response, StatusCode::CREATED).await;
    let comment_id = comment["id"].as_i64().expect("comment id");

    let response = ctx
        .admin(Method::PUT, &format!("/comments/{comment_id}/status"), &admin)
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .expect("Failed to approve");
    expect_status(response, StatusCode::OK).await;

    let response = ctx
        .admin(Method::PUT, &format!("/comments/{comment_id}/reply"), &admin)
        .json(&json!({ "reply": "Thanks for the review!" }))
        .send()
        .await
        .expect("Failed to reply");
    expect_status(response, StatusCode::OK).await;

    let response = ctx
        .user(Method::GET, &format!("/products/{product_id}/comments"), None)
        .send()
        .await
        .expect("Failed to list comments");
    let page = expect_status(response, StatusCode::OK).await;
    let listed: Vec<&Value> = page["items"]
        .as_array()
        .expect("comment page")
        .iter()
        .filter(|c| c["id"] == comment_id)
        .collect();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["reply"], "Thanks for the review!");

    let response = ctx
        .admin(Method::PUT, &format!("/comments/{comment_id}/status"), &admin)
        .json(&json!({ "status": "rejected" }))
        .send()
        .await
        .expect("Failed to reject");
    expect_status(response, StatusCode::OK).await;

    let response = ctx
        .user(Method::GET, &format!("/products/{product_id}/comments"), None)
        .send()
        .await
        .expect("Failed to list comments");
    let page = expect_status(response, StatusCode::OK).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
#[ignore = "Requires a running Emporium API and admin credentials"]
async fn test_favorites_are_idempotent() {
    let ctx = TestContext::new();
    let admin = ctx.admin_token().await;
    let (product_id, _) = ctx.create_stocked_item(&admin, "8.00", 1).await;
    let customer = ctx.register_customer().await;

    for _ in 0..2 {
        let response = ctx
            .user(Method::PUT, &format!("/favorites/{product_id}"), Some(&customer))
            .send()
            .await
            .expect("Failed to add favorite");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = ctx
        .user(Method::GET, "/favorites", Some(&customer))
        .send()
        .await
        .expect("Failed to list favorites");
    let page = expect_status(response, StatusCode::OK).await;
    assert_eq!(page["total"], 1);

    let response = ctx
        .user(Method::DELETE, &format!("/favorites/{product_id}"), Some(&customer))
        .send()
        .await
        .expect("Failed to remove favorite");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
