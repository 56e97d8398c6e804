//! Product pictures and their display order.

use sqlx::PgPool;

use emporium_core::{FileId, ProductId, ProductPicId};

use super::{Actor, RepositoryError, actor_id, is_permutation};
use crate::error::messages;
use crate::models::catalog::ProductPic;
use crate::models::content::public_path;

#[derive(Debug, sqlx::FromRow)]
struct ProductPicRow {
    id: i32,
    product_id: i32,
    file_id: i32,
    priority: i32,
    stored_name: String,
}

impl From<ProductPicRow> for ProductPic {
    fn from(row: ProductPicRow) -> Self {
        Self {
            id: ProductPicId::new(row.id),
            product_id: ProductId::new(row.product_id),
            file_id: FileId::new(row.file_id),
            priority: row.priority,
            url: public_path(&row.stored_name),
        }
    }
}

const SELECT: &str = r"
    SELECT pp.id, pp.product_id, pp.file_id, pp.priority, f.stored_name
    FROM shop.product_pic pp
    JOIN shop.file f ON f.id = pp.file_id";

pub struct ProductPicRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductPicRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Pictures of a product by priority.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductPic>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductPicRow>(&format!(
            "{SELECT} WHERE pp.product_id = $1 ORDER BY pp.priority, pp.id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Attach a file as the product's last picture.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn attach(
        &self,
        product_id: ProductId,
        file_id: FileId,
        actor: Actor,
    ) -> Result<ProductPic, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent attaches to the same product.
        sqlx::query("SELECT id FROM shop.product WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO shop.product_pic (product_id, file_id, priority, created_by)
            SELECT $1, $2, COALESCE(MAX(priority), 0) + 1, $3
            FROM shop.product_pic WHERE product_id = $1
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(file_id)
        .bind(actor_id(actor))
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, ProductPicRow>(&format!("{SELECT} WHERE pp.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Remove a picture and close the gap in priorities.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the picture is not on the product.
    pub async fn detach(
        &self,
        product_id: ProductId,
        pic_id: ProductPicId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM shop.product_pic WHERE id = $1 AND product_id = $2")
            .bind(pic_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r"
            UPDATE shop.product_pic pp
            SET priority = ranked.position
            FROM (
                SELECT id, ROW_NUMBER() OVER (ORDER BY priority, id)::INTEGER AS position
                FROM shop.product_pic WHERE product_id = $1
            ) ranked
            WHERE pp.id = ranked.id
            ",
        )
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Set priorities `1..=n` following `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` unless `ids` lists every picture of
    /// the product exactly once.
    pub async fn reorder(
        &self,
        product_id: ProductId,
        ids: &[i32],
    ) -> Result<Vec<ProductPic>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM shop.product_pic WHERE product_id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await?;

        if !is_permutation(&current, ids) {
            return Err(RepositoryError::Conflict(
                messages::INVALID_REORDER.to_string(),
            ));
        }

        sqlx::query(
            r"
            UPDATE shop.product_pic pp
            SET priority = o.position::INTEGER
            FROM UNNEST($1::INTEGER[]) WITH ORDINALITY AS o(id, position)
            WHERE pp.id = o.id
            ",
        )
        .bind(ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.list_for_product(product_id).await
    }
}
