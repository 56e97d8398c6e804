//! Registration, login and logout.
//!
//! Login and registration answer with the token in the body and also set it
//! as an `HttpOnly` cookie for browser clients.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::error::Result;
use crate::middleware::auth::TOKEN_COOKIE;
use crate::middleware::auth_rate_limiter;
use crate::models::user::{LoginInput, RegisterInput, TokenResponse};
use crate::services::auth::AuthService;
use crate::state::AppState;
use crate::validation::ValidJson;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .layer(auth_rate_limiter())
        .route("/auth/logout", post(logout))
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(input): ValidJson<RegisterInput>,
) -> Result<(StatusCode, CookieJar, Json<TokenResponse>)> {
    let response = AuthService::new(state.pool(), state.tokens())
        .register(&input)
        .await?;
    let jar = jar.add(token_cookie(&state, response.token.clone()));
    Ok((StatusCode::CREATED, jar, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(input): ValidJson<LoginInput>,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    let response = AuthService::new(state.pool(), state.tokens())
        .login(&input)
        .await?;
    tracing::info!(user_id = %response.user.id, "User logged in");
    let jar = jar.add(token_cookie(&state, response.token.clone()));
    Ok((jar, Json(response)))
}

/// Clear the token cookie. Bearer tokens stay valid until they expire.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(TOKEN_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

fn token_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config().base_url.starts_with("https://"))
        .build()
}
