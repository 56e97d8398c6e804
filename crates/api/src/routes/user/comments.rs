//! Product comments and favorites.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
};

use emporium_core::{CommentId, CommentStatus, ProductId};

use crate::db::comments::CommentFilter;
use crate::db::{CommentRepository, FavoriteRepository, ListParams, Page, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::content::{Comment, CommentInput, Favorite};
use crate::state::AppState;
use crate::validation::{Path, Query, ValidJson};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_own_comments).post(create_comment))
        .route("/comments/{id}", delete(delete_own_comment))
        .route("/products/{id}/comments", get(list_product_comments))
        .route("/favorites", get(list_favorites))
        .route(
            "/favorites/{product_id}",
            put(add_favorite).delete(remove_favorite),
        )
}

// =============================================================================
// Comments
// =============================================================================

/// New comments wait for moderation unless the shop turned approval off.
async fn create_comment(
    user: RequireUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CommentInput>,
) -> Result<(StatusCode, Json<Comment>)> {
    if !ProductRepository::new(state.pool())
        .exists(input.product_id, true)
        .await?
    {
        return Err(AppError::invalid_field("product_id", "product does not exist"));
    }

    let status = state.settings().await?.initial_comment_status();

    let comment = CommentRepository::new(state.pool())
        .create(user.id(), &input, status)
        .await?;
    tracing::info!(
        comment_id = %comment.id,
        product_id = %input.product_id,
        status = ?status,
        "Comment created"
    );
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Approved comments of an active product.
async fn list_product_comments(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Comment>>> {
    if !ProductRepository::new(state.pool())
        .exists(product_id, true)
        .await?
    {
        return Err(AppError::not_found());
    }

    let filter = CommentFilter {
        status: Some(CommentStatus::Approved),
        product_id: Some(product_id),
        user_id: None,
    };
    let page = CommentRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

/// The caller's comments in any status.
async fn list_own_comments(
    user: RequireUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Comment>>> {
    let filter = CommentFilter {
        user_id: Some(user.id()),
        ..CommentFilter::default()
    };
    let page = CommentRepository::new(state.pool())
        .list(&params, filter)
        .await?;
    Ok(Json(page))
}

async fn delete_own_comment(
    user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
) -> Result<StatusCode> {
    CommentRepository::new(state.pool())
        .delete_own(user.id(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Favorites
// =============================================================================

async fn list_favorites(
    user: RequireUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Favorite>>> {
    let page = FavoriteRepository::new(state.pool())
        .list(user.id(), &params)
        .await?;
    Ok(Json(page))
}

/// Idempotent: adding a favorite twice answers 204 both times.
async fn add_favorite(
    user: RequireUser,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    if !ProductRepository::new(state.pool())
        .exists(product_id, true)
        .await?
    {
        return Err(AppError::not_found());
    }

    FavoriteRepository::new(state.pool())
        .add(user.id(), product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_favorite(
    user: RequireUser,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    FavoriteRepository::new(state.pool())
        .remove(user.id(), product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
