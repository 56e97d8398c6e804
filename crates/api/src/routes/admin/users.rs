//! User accounts and roles.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};

use emporium_core::{Permission, RoleId, UserId};

use crate::db::users::UserFilter;
use crate::db::{ListParams, Page, RoleRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::user::{Role, RoleInput, User, UserActiveInput, UserRoleInput};
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}/active", put(set_active))
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/permissions", get(list_permissions))
}

// =============================================================================
// Users
// =============================================================================

async fn list_users(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Page<User>>> {
    admin.require(Permission::ManageUsers)?;
    let page = UserRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_user(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    admin.require(Permission::ManageUsers)?;
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn set_role(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ValidJson(input): ValidJson<UserRoleInput>,
) -> Result<Json<User>> {
    admin.require(Permission::ManageUsers)?;
    forbid_self(&admin, id)?;

    if RoleRepository::new(state.pool())
        .get(input.role_id)
        .await?
        .is_none()
    {
        return Err(AppError::invalid_field("role_id", "role does not exist"));
    }

    let user = UserRepository::new(state.pool())
        .set_role(id, input.role_id, admin.actor())
        .await?;
    tracing::info!(user_id = %id, role = %user.role.code, "User role changed");
    Ok(Json(user))
}

async fn set_active(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    ValidJson(input): ValidJson<UserActiveInput>,
) -> Result<Json<User>> {
    admin.require(Permission::ManageUsers)?;
    forbid_self(&admin, id)?;

    let user = UserRepository::new(state.pool())
        .set_active(id, input.is_active, admin.actor())
        .await?;
    tracing::info!(user_id = %id, is_active = input.is_active, "User activation changed");
    Ok(Json(user))
}

async fn delete_user(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageUsers)?;
    forbid_self(&admin, id)?;

    UserRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Admins cannot lock themselves out.
fn forbid_self(admin: &RequireAdmin, id: UserId) -> Result<()> {
    if admin.0.id == id {
        return Err(AppError::BadRequest(
            "You cannot change your own account here".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Roles
// =============================================================================

async fn list_roles(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Role>>> {
    admin.require(Permission::ManageRoles)?;
    Ok(Json(RoleRepository::new(state.pool()).list(&params).await?))
}

async fn get_role(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<Json<Role>> {
    admin.require(Permission::ManageRoles)?;
    RoleRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn create_role(
    admin: RequireAdmin,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<RoleInput>,
) -> Result<(StatusCode, Json<Role>)> {
    admin.require(Permission::ManageRoles)?;
    let role = RoleRepository::new(state.pool())
        .create(&input, admin.actor())
        .await?;
    tracing::info!(role_id = %role.id, code = %role.code, "Role created");
    Ok((StatusCode::CREATED, Json(role)))
}

async fn update_role(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
    ValidJson(input): ValidJson<RoleInput>,
) -> Result<Json<Role>> {
    admin.require(Permission::ManageRoles)?;
    let role = RoleRepository::new(state.pool())
        .update(id, &input, admin.actor())
        .await?;
    tracing::info!(role_id = %id, "Role updated");
    Ok(Json(role))
}

async fn delete_role(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<RoleId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageRoles)?;
    RoleRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every permission a role can hold.
async fn list_permissions(admin: RequireAdmin) -> Result<Json<Vec<Permission>>> {
    admin.require(Permission::ManageRoles)?;
    Ok(Json(Permission::ALL.to_vec()))
}
