//! Comment moderation.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};

use emporium_core::{CommentId, Permission};

use crate::db::comments::CommentFilter;
use crate::db::{CommentRepository, ListParams, Page};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::content::{Comment, CommentReplyInput, CommentStatusInput};
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_comments))
        .route("/comments/{id}", get(get_comment).delete(delete_comment))
        .route("/comments/{id}/status", put(set_status))
        .route("/comments/{id}/reply", put(reply))
}

/// Filter by `status`, `product_id` or `user_id`.
async fn list_comments(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<CommentFilter>,
) -> Result<Json<Page<Comment>>> {
    admin.require(Permission::ManageComments)?;
    let page = CommentRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn get_comment(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
) -> Result<Json<Comment>> {
    admin.require(Permission::ManageComments)?;
    CommentRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(AppError::not_found)
}

async fn set_status(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
    ValidJson(input): ValidJson<CommentStatusInput>,
) -> Result<Json<Comment>> {
    admin.require(Permission::ManageComments)?;
    let comment = CommentRepository::new(state.pool())
        .set_status(id, input.status, admin.actor())
        .await?;
    tracing::info!(comment_id = %id, status = ?input.status, "Comment moderated");
    Ok(Json(comment))
}

async fn reply(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
    ValidJson(input): ValidJson<CommentReplyInput>,
) -> Result<Json<Comment>> {
    admin.require(Permission::ManageComments)?;
    let comment = CommentRepository::new(state.pool())
        .reply(id, &input.reply, admin.actor())
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
) -> Result<StatusCode> {
    admin.require(Permission::ManageComments)?;
    CommentRepository::new(state.pool())
        .delete(id, admin.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
