//! Brand repository.

use sqlx::PgPool;

use emporium_core::BrandId;

use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::catalog::{Brand, BrandInput};
use crate::validation::normalize_code;

const COLUMNS: &str = "id, name, code, description, logo_file_id, created_at, updated_at";

const SORTABLE: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("code", "code"),
    ("created_at", "created_at"),
];

/// Repository for brand database operations.
pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    /// Create a new brand repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List live brands.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, params: &ListParams) -> Result<Page<Brand>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.brand", params)
            .search(&["name", "code"])
            .sortable(SORTABLE)
            .fetch(self.pool)
            .await
    }

    /// Get a live brand by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(&format!(
            "SELECT {COLUMNS} FROM shop.brand WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(brand)
    }

    /// Whether a live brand exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: BrandId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shop.brand WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a brand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, input: &BrandInput, actor: Actor) -> Result<Brand, RepositoryError> {
        sqlx::query_as::<_, Brand>(&format!(
            r"
            INSERT INTO shop.brand (name, code, description, logo_file_id, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {COLUMNS}
            "
        ))
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.description.as_deref())
        .bind(input.logo_file_id)
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))
    }

    /// Replace a brand's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist.
    /// Returns `RepositoryError::Conflict` if the code belongs to another brand.
    pub async fn update(
        &self,
        id: BrandId,
        input: &BrandInput,
        actor: Actor,
    ) -> Result<Brand, RepositoryError> {
        sqlx::query_as::<_, Brand>(&format!(
            r"
            UPDATE shop.brand
            SET name = $2, code = $3, description = $4, logo_file_id = $5,
                updated_by = $6, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.description.as_deref())
        .bind(input.logo_file_id)
        .bind(actor_id(actor))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Soft-delete a brand that no live product uses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist.
    /// Returns `RepositoryError::Conflict` if products still reference it.
    pub async fn delete(&self, id: BrandId, actor: Actor) -> Result<(), RepositoryError> {
        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shop.product WHERE brand_id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        if in_use {
            return Err(RepositoryError::Conflict(messages::IN_USE.to_string()));
        }

        super::soft_delete(self.pool, "shop.brand", id.as_i32(), actor).await
    }
}
