//! Product item (purchasable variant) repository.

use sqlx::PgPool;

use emporium_core::{ColorId, ProductId, ProductItemId};

use super::query::FilterValue;
use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::catalog::{ProductItem, ProductItemInput};
use crate::validation::normalize_code;

const COLUMNS: &str = r"
    i.id, i.product_id, i.color_id, c.name AS color_name,
    i.sku, i.price, i.stock, i.is_active, i.created_at, i.updated_at";

const FROM: &str =
    "shop.product_item i LEFT JOIN shop.color c ON c.id = i.color_id AND c.deleted_at IS NULL";

/// Filters accepted by [`ProductItemRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct ProductItemFilter {
    pub product_id: Option<ProductId>,
    pub color_id: Option<ColorId>,
    pub is_active: Option<bool>,
}

pub struct ProductItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductItemRepository<'a> {
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
        filter: ProductItemFilter,
    ) -> Result<Page<ProductItem>, RepositoryError> {
        ListQuery::new(COLUMNS, FROM, params)
            .soft_delete("i.deleted_at")
            .search(&["i.sku"])
            .sortable(&[
                ("id", "i.id"),
                ("sku", "i.sku"),
                ("price", "i.price"),
                ("stock", "i.stock"),
            ])
            .default_order("i.id DESC")
            .filter(
                "i.product_id",
                filter.product_id.map(|id| FilterValue::Int(id.as_i32())),
            )
            .filter("i.color_id", filter.color_id.map(|id| FilterValue::Int(id.as_i32())))
            .filter("i.is_active", filter.is_active.map(FilterValue::Bool))
            .fetch(self.pool)
            .await
    }

    /// Items of one product, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        only_active: bool,
    ) -> Result<Vec<ProductItem>, RepositoryError> {
        let items = sqlx::query_as::<_, ProductItem>(&format!(
            r"
            SELECT {COLUMNS} FROM {FROM}
            WHERE i.product_id = $1 AND i.deleted_at IS NULL AND (i.is_active OR NOT $2)
            ORDER BY i.price, i.id
            "
        ))
        .bind(product_id)
        .bind(only_active)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductItemId) -> Result<Option<ProductItem>, RepositoryError> {
        let item = sqlx::query_as::<_, ProductItem>(&format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE i.id = $1 AND i.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(item)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is taken.
    pub async fn create(
        &self,
        input: &ProductItemInput,
        actor: Actor,
    ) -> Result<ProductItem, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductItemId>(
            r"
            INSERT INTO shop.product_item
                (product_id, color_id, sku, price, stock, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            ",
        )
        .bind(input.product_id)
        .bind(input.color_id)
        .bind(normalize_code(&input.sku))
        .bind(input.price)
        .bind(input.stock)
        .bind(input.is_active)
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_SKU))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    /// Returns `RepositoryError::Conflict` if the SKU belongs to another item.
    pub async fn update(
        &self,
        id: ProductItemId,
        input: &ProductItemInput,
        actor: Actor,
    ) -> Result<ProductItem, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product_item
            SET product_id = $2, color_id = $3, sku = $4, price = $5, stock = $6,
                is_active = $7, updated_by = $8, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(input.product_id)
        .bind(input.color_id)
        .bind(normalize_code(&input.sku))
        .bind(input.price)
        .bind(input.stock)
        .bind(input.is_active)
        .bind(actor_id(actor))
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_SKU))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn delete(&self, id: ProductItemId, actor: Actor) -> Result<(), RepositoryError> {
        super::soft_delete(self.pool, "shop.product_item", id.as_i32(), actor).await
    }
}
