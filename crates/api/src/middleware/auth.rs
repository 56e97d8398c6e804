//! Authentication extractors.
//!
//! The bearer token is read from, in order: the `Authorization: Bearer`
//! header, the `token` cookie, then the `token` query parameter.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn update_brand(
//!     admin: RequireAdmin,
//!     State(state): State<AppState>,
//! ) -> Result<Json<Brand>> {
//!     admin.require(Permission::ManageCatalog)?;
//!     // ...
//! }
//! ```

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use emporium_core::{Permission, UserId};

use crate::error::{AppError, messages, set_sentry_user};
use crate::models::user::User;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Cookie carrying the access token.
pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Find the access token on a request.
#[must_use]
pub fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(token) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    if let Some(cookie) = CookieJar::from_headers(&parts.headers).get(TOKEN_COOKIE)
        && !cookie.value().is_empty()
    {
        return Some(cookie.value().to_string());
    }

    Query::<TokenQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Extractor for any signed-in, active user.
///
/// Rejects with 401 when the token is missing, invalid or expired, or names
/// a deleted or deactivated account.
pub struct RequireUser(pub User);

impl RequireUser {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.0.id
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)
            .ok_or_else(|| AppError::Unauthorized(messages::UNAUTHORIZED.to_string()))?;

        let user = AuthService::new(state.pool(), state.tokens())
            .authenticate(&token)
            .await
            .map_err(|e| match e {
                AuthError::InvalidToken(reason) => {
                    tracing::debug!(reason = %reason, "Rejected access token");
                    AppError::Unauthorized(messages::INVALID_TOKEN.to_string())
                }
                AuthError::Inactive => {
                    AppError::Unauthorized(messages::INACTIVE_ACCOUNT.to_string())
                }
                other => AppError::Auth(other),
            })?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", user.id.as_i32());

        Ok(Self(user))
    }
}

/// Extractor for users whose role is an admin role.
///
/// Rejects with 401 like [`RequireUser`], and with 403 for non-admin roles.
/// Individual permissions are checked in the handler with [`RequireAdmin::require`].
pub struct RequireAdmin(pub User);

impl RequireAdmin {
    /// The acting admin, for audit columns.
    #[must_use]
    pub const fn actor(&self) -> Option<UserId> {
        Some(self.0.id)
    }

    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the role lacks `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.0.has_permission(permission) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.0.id,
                permission = %permission,
                "Permission denied"
            );
            Err(AppError::Forbidden(messages::FORBIDDEN.to_string()))
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin {
            return Err(AppError::Forbidden(messages::FORBIDDEN.to_string()));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_header_wins() {
        let p = parts(
            Request::get("/api/v1/user/profile?token=from-query")
                .header(header::AUTHORIZATION, "Bearer from-header")
                .header(header::COOKIE, "token=from-cookie"),
        );
        assert_eq!(extract_token(&p).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_cookie_before_query() {
        let p = parts(
            Request::get("/x?token=from-query").header(header::COOKIE, "theme=dark; token=from-cookie"),
        );
        assert_eq!(extract_token(&p).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_query_fallback() {
        let p = parts(Request::get("/x?page=2&token=from-query"));
        assert_eq!(extract_token(&p).as_deref(), Some("from-query"));
    }

    #[test]
    fn test_other_schemes_are_ignored() {
        let p = parts(Request::get("/x").header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&p), None);
    }

    #[test]
    fn test_lowercase_scheme() {
        let p = parts(Request::get("/x").header(header::AUTHORIZATION, "bearer abc"));
        assert_eq!(extract_token(&p).as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(extract_token(&parts(Request::get("/x?token="))), None);
    }
}
