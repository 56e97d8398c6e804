//! Cart pricing, checkout and the order lifecycle.
//!
//! Pricing is pure ([`merge_cart`], [`price_lines`], [`build_quote`]) so the
//! arithmetic is tested without a database. [`OrderService`] runs it against
//! live rows: `preview` on an unlocked read, `checkout` inside a transaction
//! that holds the item and discount rows until the order is written.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use emporium_core::{AddressId, OrderId, OrderStatus, ProductItemId, UserId, round_money};

use crate::db::orders::StockRow;
use crate::db::{Actor, AddressRepository, DiscountRepository, OrderRepository, RepositoryError};
use crate::models::order::{
    CartItem, CheckoutInput, Discount, OrderDetail, PreviewInput, Quote, QuoteLine,
};
use crate::models::settings::Settings;
use crate::validation::normalize_code;

/// Errors raised while pricing or moving an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("product item {0} is unavailable")]
    Unavailable(ProductItemId),

    #[error("product item {item}: requested {requested}, only {available} in stock")]
    InsufficientStock {
        item: ProductItemId,
        requested: i32,
        available: i32,
    },

    /// The code does not exist, is not redeemable now, or the order is below its minimum.
    #[error("discount code does not apply")]
    InvalidDiscount,

    #[error("address {0} does not belong to the user")]
    UnknownAddress(AddressId),

    #[error("order cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is no longer cancellable")]
    NotCancellable,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Collapse repeated items into one line each, keeping first-seen order.
#[must_use]
pub fn merge_cart(items: &[CartItem]) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged
            .iter_mut()
            .find(|m| m.product_item_id == item.product_item_id)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(*item),
        }
    }
    merged
}

/// Price each cart line against the current item rows.
///
/// # Errors
///
/// Returns `OrderError::Unavailable` for an unknown, inactive or deleted item
/// (or one whose product is), and `OrderError::InsufficientStock` when the
/// quantity exceeds stock.
pub fn price_lines(cart: &[CartItem], stock: &[StockRow]) -> Result<Vec<QuoteLine>, OrderError> {
    cart.iter()
        .map(|item| {
            let row = stock
                .iter()
                .find(|row| row.id == item.product_item_id)
                .filter(|row| row.available)
                .ok_or(OrderError::Unavailable(item.product_item_id))?;

            if row.stock < item.quantity {
                return Err(OrderError::InsufficientStock {
                    item: row.id,
                    requested: item.quantity,
                    available: row.stock.max(0),
                });
            }

            Ok(QuoteLine {
                product_item_id: row.id,
                sku: row.sku.clone(),
                product_name: row.product_name.clone(),
                quantity: item.quantity,
                unit_price: row.price,
                total_price: round_money(row.price * Decimal::from(item.quantity)),
            })
        })
        .collect()
}

/// Total up priced lines.
///
/// `discount` is the row looked up for `requested_code`; a code that was
/// asked for but does not apply fails the quote instead of being dropped.
///
/// # Errors
///
/// Returns `OrderError::InvalidDiscount` if a requested code does not apply.
pub fn build_quote(
    lines: Vec<QuoteLine>,
    requested_code: Option<&str>,
    discount: Option<&Discount>,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<Quote, OrderError> {
    let subtotal: Decimal = lines.iter().map(|line| line.total_price).sum();

    let (discount_id, discount_code, discount_amount) = match requested_code {
        None => (None, None, Decimal::ZERO),
        Some(_) => {
            let discount = discount.ok_or(OrderError::InvalidDiscount)?;
            let amount = discount
                .apply(subtotal, now)
                .ok_or(OrderError::InvalidDiscount)?;
            (Some(discount.id), Some(discount.code.clone()), amount)
        }
    };

    let shipping_cost = settings.shipping_for(subtotal);
    let total = round_money(subtotal - discount_amount + shipping_cost);

    Ok(Quote {
        lines,
        subtotal,
        discount_code,
        discount_id,
        discount_amount,
        shipping_cost,
        total,
    })
}

/// A requested discount code, ignoring blank input.
fn requested_code(code: Option<&str>) -> Option<String> {
    code.map(normalize_code).filter(|c| !c.is_empty())
}

fn item_ids(cart: &[CartItem]) -> Vec<ProductItemId> {
    cart.iter().map(|item| item.product_item_id).collect()
}

// =============================================================================
// Service
// =============================================================================

pub struct OrderService<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price a cart without reserving anything.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if an item or the discount code is rejected.
    pub async fn preview(
        &self,
        input: &PreviewInput,
        settings: &Settings,
    ) -> Result<Quote, OrderError> {
        let cart = merge_cart(&input.items);
        let stock = OrderRepository::new(self.pool)
            .stock(&item_ids(&cart))
            .await?;
        let lines = price_lines(&cart, &stock)?;

        let code = requested_code(input.discount_code.as_deref());
        let discount = match &code {
            Some(code) => DiscountRepository::new(self.pool).get_by_code(code).await?,
            None => None,
        };

        build_quote(lines, code.as_deref(), discount.as_ref(), settings, Utc::now())
    }

    /// Place an order.
    ///
    /// Item rows and the discount row stay locked from pricing until commit,
    /// so stock and usage limits hold under concurrent checkouts.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if the address, an item or the discount code is
    /// rejected, or a write fails.
    pub async fn checkout(
        &self,
        user_id: UserId,
        input: &CheckoutInput,
        settings: &Settings,
    ) -> Result<OrderDetail, OrderError> {
        AddressRepository::new(self.pool)
            .get(user_id, input.address_id)
            .await?
            .ok_or(OrderError::UnknownAddress(input.address_id))?;

        let cart = merge_cart(&input.items);
        let code = requested_code(input.discount_code.as_deref());

        let mut tx = self.pool.begin().await?;

        let stock = OrderRepository::lock_items(&mut tx, &item_ids(&cart)).await?;
        let lines = price_lines(&cart, &stock)?;

        let discount = match &code {
            Some(code) => DiscountRepository::lock_by_code(&mut tx, code).await?,
            None => None,
        };
        let quote = build_quote(lines, code.as_deref(), discount.as_ref(), settings, Utc::now())?;

        let order_id = OrderRepository::insert(
            &mut tx,
            user_id,
            input.address_id,
            &quote,
            input.note.as_deref(),
        )
        .await?;
        if let Some(discount_id) = quote.discount_id {
            DiscountRepository::record_use(&mut tx, discount_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            user_id = %user_id,
            total = %quote.total,
            lines = quote.lines.len(),
            "Order placed"
        );

        self.detail(order_id, Some(user_id)).await
    }

    /// Cancel one of the user's own orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` (wrapped) if the order is not the
    /// user's, or `OrderError::NotCancellable` once it has shipped.
    pub async fn cancel(&self, user_id: UserId, id: OrderId) -> Result<OrderDetail, OrderError> {
        let mut tx = self.pool.begin().await?;

        let (_, status) = OrderRepository::lock_status(&mut tx, id)
            .await?
            .filter(|(owner, _)| *owner == user_id)
            .ok_or(RepositoryError::NotFound)?;

        if !status.is_cancellable() {
            return Err(OrderError::NotCancellable);
        }

        OrderRepository::restore_stock(&mut tx, id).await?;
        OrderRepository::set_status(&mut tx, id, OrderStatus::Cancelled, Some(user_id)).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, user_id = %user_id, "Order cancelled by customer");
        self.detail(id, Some(user_id)).await
    }

    /// Move an order along its lifecycle. Cancelling puts the stock back.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the lifecycle forbids the move.
    pub async fn change_status(
        &self,
        id: OrderId,
        next: OrderStatus,
        actor: Actor,
    ) -> Result<OrderDetail, OrderError> {
        let mut tx = self.pool.begin().await?;

        let (_, current) = OrderRepository::lock_status(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        if next == OrderStatus::Cancelled {
            OrderRepository::restore_stock(&mut tx, id).await?;
        }
        OrderRepository::set_status(&mut tx, id, next, actor).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, from = ?current, to = ?next, "Order status changed");
        self.detail(id, None).await
    }

    async fn detail(&self, id: OrderId, owner: Option<UserId>) -> Result<OrderDetail, OrderError> {
        OrderRepository::new(self.pool)
            .get(id, owner)
            .await?
            .ok_or(OrderError::Repository(RepositoryError::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use emporium_core::{DiscountId, DiscountKind};

    use super::*;

    fn item(id: i32, quantity: i32) -> CartItem {
        CartItem {
            product_item_id: ProductItemId::new(id),
            quantity,
        }
    }

    fn row(id: i32, price: Decimal, stock: i32) -> StockRow {
        StockRow {
            id: ProductItemId::new(id),
            sku: format!("SKU-{id}"),
            product_name: format!("Product {id}"),
            price,
            stock,
            available: true,
        }
    }

    fn settings(shipping: i64, free_from: Option<i64>) -> Settings {
        Settings {
            shop_name: "Emporium".to_string(),
            support_email: String::new(),
            currency: "USD".to_string(),
            shipping_cost: Decimal::from(shipping),
            free_shipping_threshold: free_from.map(Decimal::from),
            comments_require_approval: true,
            updated_at: Utc::now(),
        }
    }

    fn discount(kind: DiscountKind, value: i64, min_order: i64) -> Discount {
        let now = Utc::now();
        Discount {
            id: DiscountId::new(9),
            code: "SAVE".to_string(),
            kind,
            value: Decimal::from(value),
            max_amount: None,
            min_order_amount: Decimal::from(min_order),
            usage_limit: None,
            used_count: 0,
            starts_at: None,
            expires_at: Some(now + Duration::days(1)),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_merge_cart_sums_duplicates_in_order() {
        let merged = merge_cart(&[item(3, 1), item(1, 2), item(3, 4)]);
        let pairs: Vec<(i32, i32)> = merged
            .iter()
            .map(|i| (i.product_item_id.as_i32(), i.quantity))
            .collect();
        assert_eq!(pairs, [(3, 5), (1, 2)]);
    }

    #[test]
    fn test_price_lines() {
        let stock = [row(1, Decimal::new(1999, 2), 10), row(2, Decimal::from(5), 3)];
        let lines = price_lines(&[item(1, 3), item(2, 1)], &stock).unwrap_or_default();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].total_price, Decimal::new(5997, 2));
        assert_eq!(lines[1].sku, "SKU-2");
    }

    #[test]
    fn test_price_lines_rejects_missing_or_inactive() {
        let mut inactive = row(2, Decimal::ONE, 5);
        inactive.available = false;

        assert!(matches!(
            price_lines(&[item(7, 1)], &[row(1, Decimal::ONE, 5)]),
            Err(OrderError::Unavailable(id)) if id == ProductItemId::new(7)
        ));
        assert!(matches!(
            price_lines(&[item(2, 1)], &[inactive]),
            Err(OrderError::Unavailable(_))
        ));
    }

    #[test]
    fn test_price_lines_rejects_short_stock() {
        let result = price_lines(&[item(1, 4)], &[row(1, Decimal::ONE, 3)]);
        assert!(matches!(
            result,
            Err(OrderError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_quote_without_discount() {
        let lines = price_lines(&[item(1, 2)], &[row(1, Decimal::from(20), 5)]).unwrap_or_default();
        let quote = build_quote(lines, None, None, &settings(7, None), Utc::now());
        let quote = quote.ok();
        assert_eq!(quote.as_ref().map(|q| q.subtotal), Some(Decimal::from(40)));
        assert_eq!(quote.as_ref().map(|q| q.shipping_cost), Some(Decimal::from(7)));
        assert_eq!(quote.map(|q| q.total), Some(Decimal::from(47)));
    }

    #[test]
    fn test_quote_with_percent_discount_and_free_shipping() {
        let lines = price_lines(&[item(1, 5)], &[row(1, Decimal::from(20), 5)]).unwrap_or_default();
        let d = discount(DiscountKind::Percent, 10, 50);
        let quote = build_quote(lines, Some("SAVE"), Some(&d), &settings(7, Some(100)), Utc::now())
            .ok();

        assert_eq!(quote.as_ref().map(|q| q.discount_amount), Some(Decimal::from(10)));
        assert_eq!(quote.as_ref().map(|q| q.shipping_cost), Some(Decimal::ZERO));
        assert_eq!(quote.as_ref().map(|q| q.total), Some(Decimal::from(90)));
        assert_eq!(quote.and_then(|q| q.discount_id), Some(DiscountId::new(9)));
    }

    #[test]
    fn test_quote_rejects_unknown_or_inapplicable_code() {
        let lines = || price_lines(&[item(1, 1)], &[row(1, Decimal::from(20), 5)]).unwrap_or_default();
        let s = settings(0, None);

        assert!(matches!(
            build_quote(lines(), Some("NOPE"), None, &s, Utc::now()),
            Err(OrderError::InvalidDiscount)
        ));

        let d = discount(DiscountKind::Fixed, 5, 50);
        assert!(matches!(
            build_quote(lines(), Some("SAVE"), Some(&d), &s, Utc::now()),
            Err(OrderError::InvalidDiscount)
        ));
    }

    #[test]
    fn test_blank_code_is_ignored() {
        assert_eq!(requested_code(Some("  ")), None);
        assert_eq!(requested_code(Some(" save ")), Some("SAVE".to_string()));
    }
}
