//! Admin API, mounted under `/api/v1/admin`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin) and
//! checks the one [`Permission`](emporium_core::Permission) its resource needs.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog (manage_catalog)
//! GET|POST        /brands, /categories, /colors, /features
//! GET|PUT|DELETE  /brands/{id}, /categories/{id}, /colors/{id}, /features/{id}
//! GET|POST        /products, /product-items
//! GET|PUT|DELETE  /products/{id}, /product-items/{id}
//! GET|POST        /products/{id}/pics
//! PUT             /products/{id}/pics/reorder
//! DELETE          /products/{id}/pics/{pic_id}
//!
//! # Files (manage_files)
//! GET|POST        /files                 - POST is a multipart upload
//! GET|DELETE      /files/{id}
//! GET|POST        /app-pics
//! PUT             /app-pics/reorder?kind=
//! GET|PUT|DELETE  /app-pics/{id}
//!
//! # Orders (manage_orders, manage_discounts)
//! GET             /orders, /orders/{id}
//! PUT             /orders/{id}/status
//! GET|POST        /discounts
//! GET|PUT|DELETE  /discounts/{id}
//!
//! # Comments (manage_comments)
//! GET             /comments
//! GET|DELETE      /comments/{id}
//! PUT             /comments/{id}/status, /comments/{id}/reply
//!
//! # Users (manage_users, manage_roles)
//! GET             /users
//! GET|DELETE      /users/{id}
//! PUT             /users/{id}/role, /users/{id}/active
//! GET|POST        /roles
//! GET|PUT|DELETE  /roles/{id}
//! GET             /permissions
//!
//! # Settings (manage_settings)
//! GET|PUT         /settings
//! ```

mod catalog;
mod comments;
mod files;
mod orders;
mod products;
mod settings;
mod users;

use axum::Router;

use crate::state::AppState;

pub use files::FileResponse;

/// Build the admin router.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(products::router())
        .merge(files::router(max_upload_bytes))
        .merge(orders::router())
        .merge(comments::router())
        .merge(users::router())
        .merge(settings::router())
}
