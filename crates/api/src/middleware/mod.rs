//! HTTP middleware and request extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on login and registration (governor)
//!
//! Authentication is not a layer: handlers ask for [`RequireUser`] or
//! [`RequireAdmin`] and the extractor resolves the bearer token.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAdmin, RequireUser, extract_token};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
