//! Customer-facing API, mounted under `/api/v1/user`.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (register and login are rate limited per client IP)
//! POST            /auth/register, /auth/login, /auth/logout
//!
//! # Catalog (public)
//! GET             /products, /products/{id}, /products/{id}/comments
//! GET             /brands, /brands/{id}, /categories, /categories/{id}
//! GET             /colors, /features, /app-pics?kind=, /settings
//!
//! # Account (signed in)
//! GET|PUT         /profile
//! PUT             /profile/password
//! GET|POST        /addresses
//! GET|PUT|DELETE  /addresses/{id}
//! PUT             /addresses/{id}/default
//!
//! # Orders (signed in)
//! POST            /orders/preview
//! GET|POST        /orders
//! GET             /orders/{id}
//! POST            /orders/{id}/cancel
//! POST            /discounts/validate
//!
//! # Comments and favorites (signed in)
//! GET|POST        /comments
//! DELETE          /comments/{id}
//! GET             /favorites
//! PUT|DELETE      /favorites/{product_id}
//! ```

mod auth;
mod catalog;
mod comments;
mod orders;
mod profile;

use axum::Router;

use crate::state::AppState;

/// Build the user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(catalog::router())
        .merge(profile::router())
        .merge(orders::router())
        .merge(comments::router())
}
