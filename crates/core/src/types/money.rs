//! Money arithmetic for order totals and discounts.
//!
//! Amounts are `rust_decimal::Decimal` in the shop's single currency and are
//! rounded to two decimal places at every boundary that gets persisted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// How a discount's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.discount_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the subtotal, in `(0, 100]`.
    Percent,
    /// `value` is a fixed amount taken off the subtotal.
    Fixed,
}

impl DiscountKind {
    /// Check that `value` is acceptable for this kind of discount.
    #[must_use]
    pub fn accepts(self, value: Decimal) -> bool {
        match self {
            Self::Percent => value > Decimal::ZERO && value <= Decimal::ONE_HUNDRED,
            Self::Fixed => value > Decimal::ZERO,
        }
    }
}

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute how much a discount takes off `subtotal`.
///
/// Percent discounts are capped by `max_amount` when one is set. The result
/// is never negative and never larger than the subtotal.
///
/// ```
/// use emporium_core::{DiscountKind, discount_amount};
/// use rust_decimal::Decimal;
///
/// let off = discount_amount(DiscountKind::Percent, Decimal::from(10), None, Decimal::from(250));
/// assert_eq!(off, Decimal::from(25));
/// ```
#[must_use]
pub fn discount_amount(
    kind: DiscountKind,
    value: Decimal,
    max_amount: Option<Decimal>,
    subtotal: Decimal,
) -> Decimal {
    if subtotal <= Decimal::ZERO || value <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let raw = match kind {
        DiscountKind::Percent => {
            let off = subtotal * value / Decimal::ONE_HUNDRED;
            max_amount.map_or(off, |cap| off.min(cap))
        }
        DiscountKind::Fixed => value,
    };

    round_money(raw.min(subtotal).max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_percent_discount() {
        let off = discount_amount(DiscountKind::Percent, dec("15"), None, dec("80.00"));
        assert_eq!(off, dec("12.00"));
    }

    #[test]
    fn test_percent_discount_is_capped() {
        let off = discount_amount(
            DiscountKind::Percent,
            dec("50"),
            Some(dec("20")),
            dec("100"),
        );
        assert_eq!(off, dec("20"));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let off = discount_amount(DiscountKind::Fixed, dec("30"), None, dec("12.50"));
        assert_eq!(off, dec("12.50"));
    }

    #[test]
    fn test_zero_subtotal_gets_nothing() {
        let off = discount_amount(DiscountKind::Fixed, dec("5"), None, Decimal::ZERO);
        assert_eq!(off, Decimal::ZERO);
    }

    #[test]
    fn test_percent_rounds_to_cents() {
        let off = discount_amount(DiscountKind::Percent, dec("33"), None, dec("10.05"));
        // 10.05 * 0.33 = 3.3165
        assert_eq!(off, dec("3.32"));
    }

    #[test]
    fn test_kind_accepts() {
        assert!(DiscountKind::Percent.accepts(dec("100")));
        assert!(!DiscountKind::Percent.accepts(dec("100.01")));
        assert!(!DiscountKind::Percent.accepts(Decimal::ZERO));
        assert!(DiscountKind::Fixed.accepts(dec("1000")));
        assert!(!DiscountKind::Fixed.accepts(dec("-1")));
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec("2.345")), dec("2.35"));
        assert_eq!(round_money(dec("2.344")), dec("2.34"));
    }
}
