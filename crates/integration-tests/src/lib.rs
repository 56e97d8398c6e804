//! End-to-end tests for the Emporium API.
//!
//! The tests talk HTTP to a server that is already running against a
//! migrated database, so they are ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! emporium migrate
//! emporium admin create -e admin@emporium.test -p 'Adm1n-Passw0rd!'
//! cargo run -p emporium-api &
//!
//! EMPORIUM_TEST_ADMIN_EMAIL=admin@emporium.test \
//! EMPORIUM_TEST_ADMIN_PASSWORD='Adm1n-Passw0rd!' \
//!     cargo test -p emporium-integration-tests -- --ignored
//! ```
//!
//! `EMPORIUM_TEST_URL` points at the server (default `http://localhost:8080`).

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Password used for every customer the tests register.
pub const CUSTOMER_PASSWORD: &str = "Cust0mer-Passw0rd!";

/// HTTP client plus the server under test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let base_url = std::env::var("EMPORIUM_TEST_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Request against `/api/v1/user`.
    #[must_use]
    pub fn user(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        self.request(method, &format!("/api/v1/user{path}"), token)
    }

    /// Request against `/api/v1/admin`.
    #[must_use]
    pub fn admin(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, &format!("/api/v1/admin{path}"), Some(token))
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Register a fresh customer and return its bearer token.
    pub async fn register_customer(&self) -> String {
        let email = unique_email("customer");
        let response = self
            .user(Method::POST, "/auth/register", None)
            .header("x-forwarded-for", client_ip())
            .json(&json!({
                "email": email,
                "password": CUSTOMER_PASSWORD,
                "first_name": "Test",
                "last_name": "Customer",
            }))
            .send()
            .await
            .expect("Failed to register");
        let body = expect_status(response, StatusCode::CREATED).await;
        token_of(&body)
    }

    /// Log in with the admin account named by `EMPORIUM_TEST_ADMIN_EMAIL`
    /// and `EMPORIUM_TEST_ADMIN_PASSWORD`.
    pub async fn admin_token(&self) -> String {
        let email = std::env::var("EMPORIUM_TEST_ADMIN_EMAIL")
            .expect("EMPORIUM_TEST_ADMIN_EMAIL must be set");
        let password = std::env::var("EMPORIUM_TEST_ADMIN_PASSWORD")
            .expect("EMPORIUM_TEST_ADMIN_PASSWORD must be set");
        let response = self
            .user(Method::POST, "/auth/login", None)
            .header("x-forwarded-for", client_ip())
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to log in");
        let body = expect_status(response, StatusCode::OK).await;
        token_of(&body)
    }

    /// Create a brand, category, product and one item with `stock` units.
    /// Returns `(product_id, item_id)`.
    pub async fn create_stocked_item(&self, admin: &str, price: &str, stock: i32) -> (i64, i64) {
        let code = unique_code();

        let brand = self
            .admin(Method::POST, "/brands", admin)
            .json(&json!({ "name": "Test Brand", "code": format!("brand-{code}") }))
            .send()
            .await
            .expect("Failed to create brand");
        let brand = expect_status(brand, StatusCode::CREATED).await;

        let category = self
            .admin(Method::POST, "/categories", admin)
            .json(&json!({ "name": "Test Category", "code": format!("cat-{code}") }))
            .send()
            .await
            .expect("Failed to create category");
        let category = expect_status(category, StatusCode::CREATED).await;

        let product = self
            .admin(Method::POST, "/products", admin)
            .json(&json!({
                "name": "Test Product",
                "code": format!("prod-{code}"),
                "brand_id": brand["id"],
                "category_id": category["id"],
            }))
            .send()
            .await
            .expect("Failed to create product");
        let product = expect_status(product, StatusCode::CREATED).await;

        let item = self
            .admin(Method::POST, "/product-items", admin)
            .json(&json!({
                "product_id": product["id"],
                "sku": format!("SKU-{code}"),
                "price": price,
                "stock": stock,
            }))
            .send()
            .await
            .expect("Failed to create product item");
        let item = expect_status(item, StatusCode::CREATED).await;

        (id_of(&product), id_of(&item))
    }

    /// Create an address for the customer and return its id.
    pub async fn create_address(&self, token: &str) -> i64 {
        let response = self
            .user(Method::POST, "/addresses", Some(token))
            .json(&json!({
                "title": "Home",
                "recipient": "Test Customer",
                "phone": "+98 912 000 0000",
                "province": "Tehran",
                "city": "Tehran",
                "street": "1 Test Street",
                "postal_code": "1234567890",
            }))
            .send()
            .await
            .expect("Failed to create address");
        let body = expect_status(response, StatusCode::CREATED).await;
        id_of(&body)
    }

    /// Current stock of an item as the admin API reports it.
    pub async fn item_stock(&self, admin: &str, item_id: i64) -> i64 {
        let response = self
            .admin(Method::GET, &format!("/product-items/{item_id}"), admin)
            .send()
            .await
            .expect("Failed to get product item");
        let body = expect_status(response, StatusCode::OK).await;
        body["stock"].as_i64().expect("stock is a number")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert the status and return the JSON body (`Null` when empty).
pub async fn expect_status(response: Response, expected: StatusCode) -> Value {
    let status = response.status();
    let text = response.text().await.expect("Failed to read response");
    assert_eq!(status, expected, "unexpected status, body: {text}");
    if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).expect("Response is not JSON")
    }
}

/// Random private address, so the credential rate limit applies per test
/// rather than to the whole run.
#[must_use]
pub fn client_ip() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("10.{}.{}.{}", bytes[0], bytes[1], bytes[2])
}

#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@emporium.test", Uuid::new_v4().simple())
}

/// Lowercase code safe for brand, product and discount codes.
#[must_use]
pub fn unique_code() -> String {
    Uuid::new_v4().simple().to_string().chars().take(12).collect()
}

#[must_use]
pub fn id_of(body: &Value) -> i64 {
    body["id"].as_i64().expect("body has a numeric id")
}

fn token_of(body: &Value) -> String {
    body["token"]
        .as_str()
        .expect("body has a token")
        .to_string()
}

/// Decimal amounts are serialized as strings; accept numbers too.
#[must_use]
pub fn amount(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| value.as_f64())
        .expect("value is an amount")
}
