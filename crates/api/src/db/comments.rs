//! Product comments (reviews) and their moderation.

use sqlx::PgPool;

use emporium_core::{CommentId, CommentStatus, ProductId, UserId};

use super::query::FilterValue;
use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::models::content::{Comment, CommentInput};

const COLUMNS: &str = r"
    c.id, c.user_id,
    COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), SPLIT_PART(u.email, '@', 1))
        AS author,
    c.product_id, c.body, c.rating, c.status, c.reply, c.created_at, c.updated_at";

const FROM: &str = "shop.comment c JOIN shop.user u ON u.id = c.user_id";

const SORTABLE: &[(&str, &str)] = &[
    ("id", "c.id"),
    ("rating", "c.rating"),
    ("created_at", "c.created_at"),
];

/// Filters accepted by [`CommentRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct CommentFilter {
    pub status: Option<CommentStatus>,
    pub product_id: Option<ProductId>,
    pub user_id: Option<UserId>,
}

pub struct CommentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CommentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        params: &ListParams,
        filter: CommentFilter,
    ) -> Result<Page<Comment>, RepositoryError> {
        ListQuery::new(COLUMNS, FROM, params)
            .soft_delete("c.deleted_at")
            .search(&["c.body", "c.reply"])
            .sortable(SORTABLE)
            .default_order("c.id DESC")
            .filter("c.status", filter.status.map(FilterValue::CommentStatus))
            .filter(
                "c.product_id",
                filter.product_id.map(|id| FilterValue::Int(id.as_i32())),
            )
            .filter("c.user_id", filter.user_id.map(|id| FilterValue::Int(id.as_i32())))
            .fetch(self.pool)
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE c.id = $1 AND c.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(comment)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &CommentInput,
        status: CommentStatus,
    ) -> Result<Comment, RepositoryError> {
        let id = sqlx::query_scalar::<_, CommentId>(
            r"
            INSERT INTO shop.comment (user_id, product_id, body, rating, status, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $1, $1)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(input.product_id)
        .bind(input.body.trim())
        .bind(input.rating)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Approve or reject a comment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the comment does not exist.
    pub async fn set_status(
        &self,
        id: CommentId,
        status: CommentStatus,
        actor: Actor,
    ) -> Result<Comment, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.comment SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(status)
        .bind(actor_id(actor))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Set the shop's reply to a comment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the comment does not exist.
    pub async fn reply(
        &self,
        id: CommentId,
        reply: &str,
        actor: Actor,
    ) -> Result<Comment, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.comment SET reply = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(reply.trim())
        .bind(actor_id(actor))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the comment does not exist.
    pub async fn delete(&self, id: CommentId, actor: Actor) -> Result<(), RepositoryError> {
        super::soft_delete(self.pool, "shop.comment", id.as_i32(), actor).await
    }

    /// Delete a comment written by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the comment is not the user's.
    pub async fn delete_own(&self, user_id: UserId, id: CommentId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.comment SET deleted_at = NOW(), deleted_by = $2
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
