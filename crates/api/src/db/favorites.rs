//! Favorite products per user.

use sqlx::PgPool;

use emporium_core::{ProductId, UserId};

use super::query::FilterValue;
use super::{ListParams, ListQuery, Page, RepositoryError};
use crate::error::messages;
use crate::models::content::Favorite;

pub struct FavoriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavoriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's favorites among live products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        params: &ListParams,
    ) -> Result<Page<Favorite>, RepositoryError> {
        ListQuery::new(
            "f.product_id, p.name, p.code, p.is_active, f.created_at",
            "shop.favorite f JOIN shop.product p ON p.id = f.product_id",
            params,
        )
        .soft_delete("p.deleted_at")
        .search(&["p.name", "p.code"])
        .sortable(&[("name", "p.name"), ("created_at", "f.created_at")])
        .default_order("f.created_at DESC")
        .filter("f.user_id", Some(FilterValue::Int(user_id.as_i32())))
        .fetch(self.pool)
        .await
    }

    /// Add a product; adding it twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product does not exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.favorite (user_id, product_id) VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::on_foreign_key(e, messages::NOT_FOUND))?;

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product was not a favorite.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.favorite WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
