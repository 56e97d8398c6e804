//! Orders, checkout requests and discounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{
    AddressId, DiscountId, DiscountKind, OrderId, OrderItemId, OrderStatus, ProductItemId, UserId,
};

use crate::validation::{Validate, ValidationErrors, normalize_code};

/// Most distinct items accepted in one checkout.
pub const MAX_CART_LINES: usize = 50;

// =============================================================================
// Discounts
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Discount {
    pub id: DiscountId,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_amount: Option<Decimal>,
    pub min_order_amount: Decimal,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discount {
    /// Whether the code can be redeemed at `now` (ignoring order amount).
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.expires_at.is_none_or(|end| now < end)
            && self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }

    /// Amount taken off `subtotal`, or `None` if the discount does not apply.
    #[must_use]
    pub fn apply(&self, subtotal: Decimal, now: DateTime<Utc>) -> Option<Decimal> {
        if !self.is_redeemable(now) || subtotal < self.min_order_amount {
            return None;
        }
        Some(emporium_core::discount_amount(
            self.kind,
            self.value,
            self.max_amount,
            subtotal,
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountInput {
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub max_amount: Option<Decimal>,
    #[serde(default)]
    pub min_order_amount: Decimal,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for DiscountInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_code("code", &normalize_code(&self.code));

        if !self.kind.accepts(self.value) {
            match self.kind {
                DiscountKind::Percent => errors.add("value", "must be greater than 0 and at most 100"),
                DiscountKind::Fixed => errors.add("value", "must be greater than 0"),
            }
        }
        if let Some(max) = self.max_amount
            && max <= Decimal::ZERO
        {
            errors.add("max_amount", "must be greater than 0");
        }
        errors.non_negative("min_order_amount", self.min_order_amount);
        if let Some(limit) = self.usage_limit {
            errors.in_range("usage_limit", i64::from(limit), 1, i64::from(i32::MAX));
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.expires_at)
            && end <= start
        {
            errors.add("expires_at", "must be after starts_at");
        }
        errors.into_result()
    }
}

const fn default_true() -> bool {
    true
}

/// Check a code against a prospective subtotal.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountCheckInput {
    pub code: String,
    pub subtotal: Decimal,
}

impl Validate for DiscountCheckInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("code", &self.code, 64);
        errors.non_negative("subtotal", self.subtotal);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountCheck {
    pub code: String,
    pub discount_amount: Decimal,
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CartItem {
    pub product_item_id: ProductItemId,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewInput {
    pub items: Vec<CartItem>,
    pub discount_code: Option<String>,
}

impl Validate for PreviewInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_cart(&mut errors, &self.items);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutInput {
    pub address_id: AddressId,
    pub items: Vec<CartItem>,
    pub discount_code: Option<String>,
    pub note: Option<String>,
}

impl Validate for CheckoutInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_cart(&mut errors, &self.items);
        errors.optional_text("note", self.note.as_deref(), 1000);
        errors.into_result()
    }
}

fn validate_cart(errors: &mut ValidationErrors, items: &[CartItem]) {
    if items.is_empty() {
        errors.add("items", "must not be empty");
    } else if items.len() > MAX_CART_LINES {
        errors.add("items", format!("must have at most {MAX_CART_LINES} lines"));
    }
    if items.iter().any(|item| item.quantity < 1) {
        errors.add("items", "quantity must be at least 1");
    }
}

/// One priced line of a quote.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteLine {
    pub product_item_id: ProductItemId,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Priced cart, returned by preview and used to build the order.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub subtotal: Decimal,
    pub discount_code: Option<String>,
    #[serde(skip)]
    pub discount_id: Option<DiscountId>,
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount_id: Option<DiscountId>,
    pub discount_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_item_id: ProductItemId,
    pub sku: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeInput {
    pub status: OrderStatus,
}

impl Validate for StatusChangeInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn discount() -> Discount {
        let now = Utc::now();
        Discount {
            id: DiscountId::new(1),
            code: "SPRING10".to_string(),
            kind: DiscountKind::Percent,
            value: Decimal::from(10),
            max_amount: Some(Decimal::from(15)),
            min_order_amount: Decimal::from(50),
            usage_limit: Some(100),
            used_count: 0,
            starts_at: Some(now - Duration::days(1)),
            expires_at: Some(now + Duration::days(1)),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_caps_percent() {
        let d = discount();
        assert_eq!(d.apply(Decimal::from(300), Utc::now()), Some(Decimal::from(15)));
        assert_eq!(d.apply(Decimal::from(80), Utc::now()), Some(Decimal::from(8)));
    }

    #[test]
    fn test_apply_respects_minimum_order() {
        assert_eq!(discount().apply(Decimal::from(49), Utc::now()), None);
    }

    #[test]
    fn test_expired_or_exhausted_codes_do_not_apply() {
        let mut d = discount();
        assert!(!d.is_redeemable(Utc::now() + Duration::days(2)));
        assert!(!d.is_redeemable(Utc::now() - Duration::days(2)));

        d.used_count = 100;
        assert!(!d.is_redeemable(Utc::now()));

        d.used_count = 0;
        d.is_active = false;
        assert!(!d.is_redeemable(Utc::now()));
    }

    #[test]
    fn test_discount_input_rules() {
        let now = Utc::now();
        let input = DiscountInput {
            code: "big".to_string(),
            kind: DiscountKind::Percent,
            value: Decimal::from(120),
            max_amount: None,
            min_order_amount: Decimal::ZERO,
            usage_limit: Some(0),
            starts_at: Some(now),
            expires_at: Some(now - Duration::hours(1)),
            is_active: true,
        };
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("value").len(), 1);
        assert_eq!(errors.field("usage_limit").len(), 1);
        assert_eq!(errors.field("expires_at"), ["must be after starts_at"]);
    }

    #[test]
    fn test_cart_rules() {
        let input = PreviewInput {
            items: vec![CartItem {
                product_item_id: ProductItemId::new(1),
                quantity: 0,
            }],
            discount_code: None,
        };
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("items"), ["quantity must be at least 1"]);

        let empty = PreviewInput {
            items: Vec::new(),
            discount_code: None,
        };
        assert!(empty.validate().is_err());
    }
}
