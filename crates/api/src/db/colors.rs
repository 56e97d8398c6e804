//! Color repository.

use sqlx::PgPool;

use emporium_core::ColorId;

use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::catalog::{Color, ColorInput};
use crate::validation::normalize_code;

const COLUMNS: &str = "id, name, code, hex, created_at, updated_at";

pub struct ColorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ColorRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, params: &ListParams) -> Result<Page<Color>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.color", params)
            .search(&["name", "code"])
            .sortable(&[("id", "id"), ("name", "name"), ("code", "code")])
            .fetch(self.pool)
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ColorId) -> Result<Option<Color>, RepositoryError> {
        let color = sqlx::query_as::<_, Color>(&format!(
            "SELECT {COLUMNS} FROM shop.color WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(color)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ColorId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shop.color WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, input: &ColorInput, actor: Actor) -> Result<Color, RepositoryError> {
        sqlx::query_as::<_, Color>(&format!(
            r"
            INSERT INTO shop.color (name, code, hex, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {COLUMNS}
            "
        ))
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.hex.to_uppercase())
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the color does not exist.
    /// Returns `RepositoryError::Conflict` if the code belongs to another color.
    pub async fn update(
        &self,
        id: ColorId,
        input: &ColorInput,
        actor: Actor,
    ) -> Result<Color, RepositoryError> {
        sqlx::query_as::<_, Color>(&format!(
            r"
            UPDATE shop.color
            SET name = $2, code = $3, hex = $4, updated_by = $5, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.hex.to_uppercase())
        .bind(actor_id(actor))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the color does not exist.
    /// Returns `RepositoryError::Conflict` if live items still use it.
    pub async fn delete(&self, id: ColorId, actor: Actor) -> Result<(), RepositoryError> {
        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shop.product_item WHERE color_id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        if in_use {
            return Err(RepositoryError::Conflict(messages::IN_USE.to_string()));
        }

        super::soft_delete(self.pool, "shop.color", id.as_i32(), actor).await
    }
}
