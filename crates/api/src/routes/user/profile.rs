//! The signed-in user's profile, password and addresses.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};

use emporium_core::AddressId;

use crate::db::{AddressRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::user::{Address, AddressInput, ChangePasswordInput, ProfileInput, User};
use crate::services::auth::AuthService;
use crate::state::AppState;
use crate::validation::{Path, ValidJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/password", put(change_password))
        .route("/addresses", get(list_addresses).post(create_address))
        .route(
            "/addresses/{id}",
            get(get_address).put(update_address).delete(delete_address),
        )
        .route("/addresses/{id}/default", put(set_default_address))
}

// =============================================================================
// Profile
// =============================================================================

async fn get_profile(RequireUser(user): RequireUser) -> Json<User> {
    Json(user)
}

async fn update_profile(
    user: RequireUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ProfileInput>,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .update_profile(user.id(), &input)
        .await?;
    Ok(Json(user))
}

async fn change_password(
    user: RequireUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ChangePasswordInput>,
) -> Result<StatusCode> {
    AuthService::new(state.pool(), state.tokens())
        .change_password(user.id(), &input)
        .await?;
    tracing::info!(user_id = %user.id(), "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Addresses
// =============================================================================

async fn list_addresses(
    user: RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id())
        .await?;
    Ok(Json(addresses))
}

async fn get_address(
    user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    AddressRepository::new(state.pool())
        .get(user.id(), id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

/// The first address a user adds becomes the default.
async fn create_address(
    user: RequireUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = AddressRepository::new(state.pool())
        .create(user.id(), &input)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

async fn update_address(
    user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
    ValidJson(input): ValidJson<AddressInput>,
) -> Result<Json<Address>> {
    let address = AddressRepository::new(state.pool())
        .update(user.id(), id, &input)
        .await?;
    Ok(Json(address))
}

async fn set_default_address(
    user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    let address = AddressRepository::new(state.pool())
        .set_default(user.id(), id)
        .await?;
    Ok(Json(address))
}

async fn delete_address(
    user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .delete(user.id(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
