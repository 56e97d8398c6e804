//! Order repository.
//!
//! Plain reads take the pool. The checkout and cancellation steps take an
//! open transaction so the caller can lock item rows, move stock and write
//! the order atomically.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use emporium_core::{AddressId, OrderId, OrderStatus, ProductItemId, UserId};

use super::query::FilterValue;
use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::models::order::{Order, OrderDetail, OrderItem, Quote};

const COLUMNS: &str = r"
    id, user_id, address_id, status, subtotal, discount_id, discount_amount,
    shipping_cost, total, note, created_at, updated_at";

const STOCK_QUERY: &str = r"
    SELECT i.id, i.sku, p.name AS product_name, i.price, i.stock,
           (i.is_active AND i.deleted_at IS NULL
            AND p.is_active AND p.deleted_at IS NULL) AS available
    FROM shop.product_item i
    JOIN shop.product p ON p.id = i.product_id
    WHERE i.id = ANY($1)
    ORDER BY i.id";

/// Filters accepted by [`OrderRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
}

/// Price and stock of a product item as seen by checkout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockRow {
    pub id: ProductItemId,
    pub sku: String,
    pub product_name: String,
    pub price: Decimal,
    pub stock: i32,
    /// Item and product are both live and active.
    pub available: bool,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
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
        filter: OrderFilter,
    ) -> Result<Page<Order>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.order", params)
            .search(&["note"])
            .sortable(&[
                ("id", "id"),
                ("total", "total"),
                ("created_at", "created_at"),
            ])
            .filter("status", filter.status.map(FilterValue::OrderStatus))
            .filter("user_id", filter.user_id.map(|id| FilterValue::Int(id.as_i32())))
            .fetch(self.pool)
            .await
    }

    /// An order with its lines, optionally restricted to one user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            SELECT {COLUMNS} FROM shop.order
            WHERE id = $1 AND deleted_at IS NULL AND ($2::INTEGER IS NULL OR user_id = $2)
            "
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT oi.id, oi.product_item_id, i.sku, p.name AS product_name,
                   oi.quantity, oi.unit_price, oi.total_price
            FROM shop.order_item oi
            JOIN shop.product_item i ON i.id = oi.product_item_id
            JOIN shop.product p ON p.id = i.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(OrderDetail { order, items }))
    }

    /// Current price and stock of the given items, without locking.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock(&self, ids: &[ProductItemId]) -> Result<Vec<StockRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockRow>(STOCK_QUERY)
            .bind(raw_ids(ids))
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    /// Lock the given items and report what checkout needs to know.
    ///
    /// Rows are locked in id order so concurrent checkouts cannot deadlock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_items(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[ProductItemId],
    ) -> Result<Vec<StockRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockRow>(&format!("{STOCK_QUERY} FOR UPDATE OF i"))
            .bind(raw_ids(ids))
            .fetch_all(&mut **tx)
            .await?;

        Ok(rows)
    }

    /// Write the order and its lines and take the stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        address_id: AddressId,
        quote: &Quote,
        note: Option<&str>,
    ) -> Result<OrderId, RepositoryError> {
        let order_id = sqlx::query_scalar::<_, OrderId>(
            r"
            INSERT INTO shop.order
                (user_id, address_id, status, subtotal, discount_id, discount_amount,
                 shipping_cost, total, note, created_by, updated_by)
            VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8, $1, $1)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(address_id)
        .bind(quote.subtotal)
        .bind(quote.discount_id)
        .bind(quote.discount_amount)
        .bind(quote.shipping_cost)
        .bind(quote.total)
        .bind(note.map(str::trim).filter(|n| !n.is_empty()))
        .fetch_one(&mut **tx)
        .await?;

        let item_ids: Vec<i32> = quote.lines.iter().map(|l| l.product_item_id.as_i32()).collect();
        let quantities: Vec<i32> = quote.lines.iter().map(|l| l.quantity).collect();
        let unit_prices: Vec<Decimal> = quote.lines.iter().map(|l| l.unit_price).collect();
        let totals: Vec<Decimal> = quote.lines.iter().map(|l| l.total_price).collect();

        sqlx::query(
            r"
            INSERT INTO shop.order_item (order_id, product_item_id, quantity, unit_price, total_price)
            SELECT $1, item_id, quantity, unit_price, total_price
            FROM UNNEST($2::INTEGER[], $3::INTEGER[], $4::NUMERIC[], $5::NUMERIC[])
                AS l(item_id, quantity, unit_price, total_price)
            ",
        )
        .bind(order_id)
        .bind(&item_ids)
        .bind(&quantities)
        .bind(&unit_prices)
        .bind(&totals)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r"
            UPDATE shop.product_item i
            SET stock = i.stock - l.quantity, updated_at = NOW()
            FROM UNNEST($1::INTEGER[], $2::INTEGER[]) AS l(item_id, quantity)
            WHERE i.id = l.item_id
            ",
        )
        .bind(&item_ids)
        .bind(&quantities)
        .execute(&mut **tx)
        .await?;

        Ok(order_id)
    }

    /// Lock an order row and return its owner and status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_status(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
    ) -> Result<Option<(UserId, OrderStatus)>, RepositoryError> {
        let row = sqlx::query_as::<_, (UserId, OrderStatus)>(
            "SELECT user_id, status FROM shop.order WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
        status: OrderStatus,
        actor: Actor,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE shop.order SET status = $2, updated_by = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(actor_id(actor))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Put an order's quantities back into stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn restore_stock(
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE shop.product_item i
            SET stock = i.stock + oi.quantity, updated_at = NOW()
            FROM shop.order_item oi
            WHERE oi.order_id = $1 AND oi.product_item_id = i.id
            ",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn raw_ids(ids: &[ProductItemId]) -> Vec<i32> {
    ids.iter().map(ProductItemId::as_i32).collect()
}
