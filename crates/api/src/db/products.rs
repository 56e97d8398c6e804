//! Product repository.
//!
//! Products are listed with their brand and category names joined in and the
//! lowest active item price computed per row. Feature values are replaced as
//! a whole on every create/update.

use sqlx::{PgPool, Postgres, Transaction};

use emporium_core::{BrandId, CategoryId, ProductId};

use super::query::FilterValue;
use super::{
    Actor, ListParams, ListQuery, Page, ProductItemRepository, ProductPicRepository,
    RepositoryError, actor_id,
};
use crate::error::messages;
use crate::models::catalog::{
    FeatureValueInput, Product, ProductDetail, ProductFeatureValue, ProductInput,
};
use crate::validation::normalize_code;

const COLUMNS: &str = r"
    p.id, p.name, p.code, p.description,
    p.brand_id, b.name AS brand_name,
    p.category_id, c.name AS category_name,
    p.is_active,
    (SELECT MIN(i.price) FROM shop.product_item i
     WHERE i.product_id = p.id AND i.is_active AND i.deleted_at IS NULL) AS min_price,
    p.created_at, p.updated_at";

const FROM: &str = r"
    shop.product p
    JOIN shop.brand b ON b.id = p.brand_id
    JOIN shop.category c ON c.id = p.category_id";

const SORTABLE: &[(&str, &str)] = &[
    ("id", "p.id"),
    ("name", "p.name"),
    ("code", "p.code"),
    ("price", "min_price"),
    ("created_at", "p.created_at"),
];

/// Filters accepted by [`ProductRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct ProductFilter {
    pub brand_id: Option<BrandId>,
    pub category_id: Option<CategoryId>,
    pub is_active: Option<bool>,
}

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
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
        filter: ProductFilter,
    ) -> Result<Page<Product>, RepositoryError> {
        ListQuery::new(COLUMNS, FROM, params)
            .soft_delete("p.deleted_at")
            .search(&["p.name", "p.code", "b.name"])
            .sortable(SORTABLE)
            .default_order("p.id DESC")
            .filter("p.brand_id", filter.brand_id.map(|id| FilterValue::Int(id.as_i32())))
            .filter(
                "p.category_id",
                filter.category_id.map(|id| FilterValue::Int(id.as_i32())),
            )
            .filter("p.is_active", filter.is_active.map(FilterValue::Bool))
            .fetch(self.pool)
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE p.id = $1 AND p.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Whether a live product exists, optionally requiring it to be active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ProductId, only_active: bool) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.product
                WHERE id = $1 AND deleted_at IS NULL AND (is_active OR NOT $2)
            )
            ",
        )
        .bind(id)
        .bind(only_active)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Product with items, features and pictures.
    ///
    /// With `only_active`, inactive products yield `None` and inactive items
    /// are left out.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn get_detail(
        &self,
        id: ProductId,
        only_active: bool,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.get(id).await? else {
            return Ok(None);
        };
        if only_active && !product.is_active {
            return Ok(None);
        }

        let items_repo = ProductItemRepository::new(self.pool);
        let pics_repo = ProductPicRepository::new(self.pool);
        let (items, features, pics) = tokio::try_join!(
            items_repo.list_for_product(id, only_active),
            self.features(id),
            pics_repo.list_for_product(id),
        )?;

        Ok(Some(ProductDetail {
            product,
            items,
            features,
            pics,
        }))
    }

    /// Feature values of a product, by feature name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn features(&self, id: ProductId) -> Result<Vec<ProductFeatureValue>, RepositoryError> {
        let features = sqlx::query_as::<_, ProductFeatureValue>(
            r"
            SELECT pf.feature_id, f.name, f.code, pf.value
            FROM shop.product_feature pf
            JOIN shop.feature f ON f.id = pf.feature_id
            WHERE pf.product_id = $1 AND f.deleted_at IS NULL
            ORDER BY f.name
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(features)
    }

    /// Create a product with its feature values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(
        &self,
        input: &ProductInput,
        actor: Actor,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO shop.product
                (name, code, description, brand_id, category_id, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.description.as_deref())
        .bind(input.brand_id)
        .bind(input.category_id)
        .bind(input.is_active)
        .bind(actor_id(actor))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?;

        replace_features(&mut tx, id, &input.features).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a product's fields and feature values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the code belongs to another product.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
        actor: Actor,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET name = $2, code = $3, description = $4, brand_id = $5, category_id = $6,
                is_active = $7, updated_by = $8, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.description.as_deref())
        .bind(input.brand_id)
        .bind(input.category_id)
        .bind(input.is_active)
        .bind(actor_id(actor))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        replace_features(&mut tx, id, &input.features).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Soft-delete a product together with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId, actor: Actor) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE shop.product SET deleted_at = NOW(), deleted_by = $2
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

        sqlx::query(
            r"
            UPDATE shop.product_item SET deleted_at = NOW(), deleted_by = $2
            WHERE product_id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(actor_id(actor))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn replace_features(
    tx: &mut Transaction<'_, Postgres>,
    product_id: ProductId,
    features: &[FeatureValueInput],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM shop.product_feature WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;

    if features.is_empty() {
        return Ok(());
    }

    let feature_ids: Vec<i32> = features.iter().map(|f| f.feature_id.as_i32()).collect();
    let values: Vec<String> = features.iter().map(|f| f.value.trim().to_string()).collect();

    sqlx::query(
        r"
        INSERT INTO shop.product_feature (product_id, feature_id, value)
        SELECT $1, feature_id, value
        FROM UNNEST($2::INTEGER[], $3::TEXT[]) AS f(feature_id, value)
        ",
    )
    .bind(product_id)
    .bind(feature_ids)
    .bind(values)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
