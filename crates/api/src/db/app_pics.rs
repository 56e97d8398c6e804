//! App pictures: banners, sliders and popups shown by the storefront.
//!
//! Priorities are kept per kind; reordering a kind must list every live
//! picture of that kind.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use emporium_core::{AppPicId, AppPicKind, FileId};

use super::query::FilterValue;
use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id, is_permutation};
use crate::error::messages;
use crate::models::content::{AppPic, AppPicInput, public_path};

#[derive(Debug, sqlx::FromRow)]
struct AppPicRow {
    id: i32,
    file_id: i32,
    title: String,
    link: Option<String>,
    kind: AppPicKind,
    priority: i32,
    is_active: bool,
    stored_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AppPicRow> for AppPic {
    fn from(row: AppPicRow) -> Self {
        Self {
            id: AppPicId::new(row.id),
            file_id: FileId::new(row.file_id),
            title: row.title,
            link: row.link,
            kind: row.kind,
            priority: row.priority,
            is_active: row.is_active,
            url: public_path(&row.stored_name),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = r"
    a.id, a.file_id, a.title, a.link, a.kind, a.priority, a.is_active,
    f.stored_name, a.created_at, a.updated_at";

const FROM: &str = "shop.app_pic a JOIN shop.file f ON f.id = a.file_id";

/// Filters accepted by [`AppPicRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct AppPicFilter {
    pub kind: Option<AppPicKind>,
    pub is_active: Option<bool>,
}

pub struct AppPicRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AppPicRepository<'a> {
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
        filter: AppPicFilter,
    ) -> Result<Page<AppPic>, RepositoryError> {
        let page = ListQuery::new(COLUMNS, FROM, params)
            .soft_delete("a.deleted_at")
            .search(&["a.title"])
            .sortable(&[("id", "a.id"), ("priority", "a.priority"), ("title", "a.title")])
            .default_order("a.kind, a.priority")
            .filter("a.kind", filter.kind.map(FilterValue::AppPicKind))
            .filter("a.is_active", filter.is_active.map(FilterValue::Bool))
            .fetch::<AppPicRow>(self.pool)
            .await?;

        Ok(page.map(Into::into))
    }

    /// Active pictures of one kind, by priority.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, kind: AppPicKind) -> Result<Vec<AppPic>, RepositoryError> {
        let rows = sqlx::query_as::<_, AppPicRow>(&format!(
            r"
            SELECT {COLUMNS} FROM {FROM}
            WHERE a.kind = $1 AND a.is_active AND a.deleted_at IS NULL
            ORDER BY a.priority, a.id
            "
        ))
        .bind(kind)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AppPicId) -> Result<Option<AppPic>, RepositoryError> {
        let row = sqlx::query_as::<_, AppPicRow>(&format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE a.id = $1 AND a.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a picture as the last of its kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &AppPicInput, actor: Actor) -> Result<AppPic, RepositoryError> {
        let id = sqlx::query_scalar::<_, AppPicId>(
            r"
            INSERT INTO shop.app_pic
                (file_id, title, link, kind, priority, is_active, created_by, updated_by)
            SELECT $1, $2, $3, $4, COALESCE(MAX(priority), 0) + 1, $5, $6, $6
            FROM shop.app_pic WHERE kind = $4 AND deleted_at IS NULL
            RETURNING id
            ",
        )
        .bind(input.file_id)
        .bind(input.title.trim())
        .bind(input.link.as_deref())
        .bind(input.kind)
        .bind(input.is_active)
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update a picture. Moving it to another kind appends it to that kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the picture does not exist.
    pub async fn update(
        &self,
        id: AppPicId,
        input: &AppPicInput,
        actor: Actor,
    ) -> Result<AppPic, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.app_pic a
            SET file_id = $2, title = $3, link = $4, is_active = $6,
                priority = CASE WHEN a.kind = $5 THEN a.priority ELSE (
                    SELECT COALESCE(MAX(priority), 0) + 1
                    FROM shop.app_pic WHERE kind = $5 AND deleted_at IS NULL
                ) END,
                kind = $5, updated_by = $7, updated_at = NOW()
            WHERE a.id = $1 AND a.deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(input.file_id)
        .bind(input.title.trim())
        .bind(input.link.as_deref())
        .bind(input.kind)
        .bind(input.is_active)
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
    /// Returns `RepositoryError::NotFound` if the picture does not exist.
    pub async fn delete(&self, id: AppPicId, actor: Actor) -> Result<(), RepositoryError> {
        super::soft_delete(self.pool, "shop.app_pic", id.as_i32(), actor).await
    }

    /// Set priorities `1..=n` within `kind` following `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` unless `ids` lists every live
    /// picture of the kind exactly once.
    pub async fn reorder(
        &self,
        kind: AppPicKind,
        ids: &[i32],
    ) -> Result<Vec<AppPic>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM shop.app_pic WHERE kind = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(kind)
        .fetch_all(&mut *tx)
        .await?;

        if !is_permutation(&current, ids) {
            return Err(RepositoryError::Conflict(
                messages::INVALID_REORDER.to_string(),
            ));
        }

        sqlx::query(
            r"
            UPDATE shop.app_pic a
            SET priority = o.position::INTEGER, updated_at = NOW()
            FROM UNNEST($1::INTEGER[]) WITH ORDINALITY AS o(id, position)
            WHERE a.id = o.id
            ",
        )
        .bind(ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let rows = sqlx::query_as::<_, AppPicRow>(&format!(
            r"
            SELECT {COLUMNS} FROM {FROM}
            WHERE a.kind = $1 AND a.deleted_at IS NULL
            ORDER BY a.priority, a.id
            "
        ))
        .bind(kind)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
