//! Feature (product attribute) repository.

use sqlx::PgPool;

use emporium_core::FeatureId;

use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::catalog::{Feature, FeatureInput};
use crate::validation::normalize_code;

const COLUMNS: &str = "id, name, code, created_at, updated_at";

pub struct FeatureRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FeatureRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, params: &ListParams) -> Result<Page<Feature>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.feature", params)
            .search(&["name", "code"])
            .sortable(&[("id", "id"), ("name", "name"), ("code", "code")])
            .fetch(self.pool)
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: FeatureId) -> Result<Option<Feature>, RepositoryError> {
        let feature = sqlx::query_as::<_, Feature>(&format!(
            "SELECT {COLUMNS} FROM shop.feature WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(feature)
    }

    /// IDs from `ids` that do not name a live feature.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn missing(&self, ids: &[FeatureId]) -> Result<Vec<FeatureId>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(FeatureId::as_i32).collect();
        let missing = sqlx::query_scalar::<_, FeatureId>(
            r"
            SELECT wanted.id
            FROM UNNEST($1::INTEGER[]) AS wanted(id)
            WHERE NOT EXISTS (
                SELECT 1 FROM shop.feature f WHERE f.id = wanted.id AND f.deleted_at IS NULL
            )
            ",
        )
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        Ok(missing)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(
        &self,
        input: &FeatureInput,
        actor: Actor,
    ) -> Result<Feature, RepositoryError> {
        sqlx::query_as::<_, Feature>(&format!(
            r"
            INSERT INTO shop.feature (name, code, created_by, updated_by)
            VALUES ($1, $2, $3, $3)
            RETURNING {COLUMNS}
            "
        ))
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the feature does not exist.
    /// Returns `RepositoryError::Conflict` if the code belongs to another feature.
    pub async fn update(
        &self,
        id: FeatureId,
        input: &FeatureInput,
        actor: Actor,
    ) -> Result<Feature, RepositoryError> {
        sqlx::query_as::<_, Feature>(&format!(
            r"
            UPDATE shop.feature
            SET name = $2, code = $3, updated_by = $4, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(actor_id(actor))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Soft-delete a feature and drop its values from products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the feature does not exist.
    pub async fn delete(&self, id: FeatureId, actor: Actor) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE shop.feature SET deleted_at = NOW(), deleted_by = $2
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(actor_id(actor))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM shop.product_feature WHERE feature_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
