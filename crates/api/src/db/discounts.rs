//! Discount code repository.

use sqlx::{PgPool, Postgres, Transaction};

use emporium_core::DiscountId;

use super::query::FilterValue;
use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::order::{Discount, DiscountInput};
use crate::validation::normalize_code;

const COLUMNS: &str = r"
    id, code, kind, value, max_amount, min_order_amount, usage_limit, used_count,
    starts_at, expires_at, is_active, created_at, updated_at";

/// Filters accepted by [`DiscountRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct DiscountFilter {
    pub is_active: Option<bool>,
}

pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
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
        filter: DiscountFilter,
    ) -> Result<Page<Discount>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.discount", params)
            .search(&["code"])
            .sortable(&[
                ("id", "id"),
                ("code", "code"),
                ("expires_at", "expires_at"),
                ("used_count", "used_count"),
            ])
            .filter("is_active", filter.is_active.map(FilterValue::Bool))
            .fetch(self.pool)
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DiscountId) -> Result<Option<Discount>, RepositoryError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {COLUMNS} FROM shop.discount WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(discount)
    }

    /// Look a code up case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Discount>, RepositoryError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {COLUMNS} FROM shop.discount WHERE code = $1 AND deleted_at IS NULL"
        ))
        .bind(normalize_code(code))
        .fetch_optional(self.pool)
        .await?;

        Ok(discount)
    }

    /// Look a code up and lock its row for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_by_code(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<Discount>, RepositoryError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {COLUMNS} FROM shop.discount WHERE code = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(normalize_code(code))
        .fetch_optional(&mut **tx)
        .await?;

        Ok(discount)
    }

    /// Count one redemption.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_use(
        tx: &mut Transaction<'_, Postgres>,
        id: DiscountId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE shop.discount SET used_count = used_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(
        &self,
        input: &DiscountInput,
        actor: Actor,
    ) -> Result<Discount, RepositoryError> {
        sqlx::query_as::<_, Discount>(&format!(
            r"
            INSERT INTO shop.discount
                (code, kind, value, max_amount, min_order_amount, usage_limit,
                 starts_at, expires_at, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {COLUMNS}
            "
        ))
        .bind(normalize_code(&input.code))
        .bind(input.kind)
        .bind(input.value)
        .bind(input.max_amount)
        .bind(input.min_order_amount)
        .bind(input.usage_limit)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.is_active)
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))
    }

    /// Replace a discount's terms. `used_count` is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount does not exist.
    /// Returns `RepositoryError::Conflict` if the code belongs to another discount.
    pub async fn update(
        &self,
        id: DiscountId,
        input: &DiscountInput,
        actor: Actor,
    ) -> Result<Discount, RepositoryError> {
        sqlx::query_as::<_, Discount>(&format!(
            r"
            UPDATE shop.discount
            SET code = $2, kind = $3, value = $4, max_amount = $5, min_order_amount = $6,
                usage_limit = $7, starts_at = $8, expires_at = $9, is_active = $10,
                updated_by = $11, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(normalize_code(&input.code))
        .bind(input.kind)
        .bind(input.value)
        .bind(input.max_amount)
        .bind(input.min_order_amount)
        .bind(input.usage_limit)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .bind(input.is_active)
        .bind(actor_id(actor))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount does not exist.
    pub async fn delete(&self, id: DiscountId, actor: Actor) -> Result<(), RepositoryError> {
        super::soft_delete(self.pool, "shop.discount", id.as_i32(), actor).await
    }
}
