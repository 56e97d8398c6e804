//! Shop-wide settings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use emporium_core::CommentStatus;

use crate::validation::{Validate, ValidationErrors};

/// The settings row, typed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Settings {
    pub shop_name: String,
    pub support_email: String,
    pub currency: String,
    /// Flat shipping charge per order.
    pub shipping_cost: Decimal,
    /// Orders whose subtotal reaches this ship free.
    pub free_shipping_threshold: Option<Decimal>,
    /// New comments start as `pending` when set, `approved` otherwise.
    pub comments_require_approval: bool,
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// Status a newly created comment starts in.
    #[must_use]
    pub fn initial_comment_status(&self) -> CommentStatus {
        if self.comments_require_approval {
            CommentStatus::Pending
        } else {
            CommentStatus::Approved
        }
    }

    /// Shipping charged for an order with `subtotal`.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        match self.free_shipping_threshold {
            Some(threshold) if subtotal >= threshold => Decimal::ZERO,
            _ => self.shipping_cost,
        }
    }
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub shop_name: Option<String>,
    pub support_email: Option<String>,
    pub currency: Option<String>,
    pub shipping_cost: Option<Decimal>,
    /// `null` clears the threshold.
    #[serde(default, deserialize_with = "present")]
    pub free_shipping_threshold: Option<Option<Decimal>>,
    pub comments_require_approval: Option<bool>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SettingsUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.shop_name.is_none()
            && self.support_email.is_none()
            && self.currency.is_none()
            && self.shipping_cost.is_none()
            && self.free_shipping_threshold.is_none()
            && self.comments_require_approval.is_none()
    }
}

impl Validate for SettingsUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.is_empty() {
            errors.add("settings", "at least one field is required");
        }
        if let Some(name) = &self.shop_name {
            errors.require_text("shop_name", name, 128);
        }
        if let Some(email) = &self.support_email
            && !email.is_empty()
            && emporium_core::Email::parse(email).is_err()
        {
            errors.add("support_email", "must be an email address");
        }
        if let Some(currency) = &self.currency
            && !is_currency_code(currency)
        {
            errors.add("currency", "must be a three-letter ISO code");
        }
        if let Some(cost) = self.shipping_cost {
            errors.non_negative("shipping_cost", cost);
        }
        if let Some(Some(threshold)) = self.free_shipping_threshold {
            errors.non_negative("free_shipping_threshold", threshold);
        }
        errors.into_result()
    }
}

/// Three ASCII letters in any case, surrounding whitespace ignored.
fn is_currency_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Stored form of an accepted currency code: `" eur"` becomes `"EUR"`.
#[must_use]
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threshold: Option<i64>) -> Settings {
        Settings {
            shop_name: "Emporium".to_string(),
            support_email: String::new(),
            currency: "USD".to_string(),
            shipping_cost: Decimal::from(7),
            free_shipping_threshold: threshold.map(Decimal::from),
            comments_require_approval: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_free_shipping_threshold() {
        let s = settings(Some(100));
        assert_eq!(s.shipping_for(Decimal::from(99)), Decimal::from(7));
        assert_eq!(s.shipping_for(Decimal::from(100)), Decimal::ZERO);
        assert_eq!(settings(None).shipping_for(Decimal::from(1000)), Decimal::from(7));
    }

    #[test]
    fn test_comment_approval_setting() {
        let mut s = settings(None);
        assert_eq!(s.initial_comment_status(), CommentStatus::Pending);
        s.comments_require_approval = false;
        assert_eq!(s.initial_comment_status(), CommentStatus::Approved);
    }

    #[test]
    fn test_update_null_vs_absent() {
        let cleared: SettingsUpdate =
            serde_json::from_str(r#"{"free_shipping_threshold": null}"#).unwrap_or_default();
        assert_eq!(cleared.free_shipping_threshold, Some(None));

        let absent: SettingsUpdate =
            serde_json::from_str(r#"{"shop_name": "Bazaar"}"#).unwrap_or_default();
        assert_eq!(absent.free_shipping_threshold, None);
    }

    #[test]
    fn test_empty_update_is_rejected() {
        assert!(SettingsUpdate::default().validate().is_err());
    }

    fn currency_update(code: &str) -> SettingsUpdate {
        SettingsUpdate {
            currency: Some(code.to_string()),
            ..SettingsUpdate::default()
        }
    }

    #[test]
    fn test_currency_any_case_is_accepted_and_uppercased() {
        assert!(currency_update("usd").validate().is_ok());
        assert!(currency_update(" Eur ").validate().is_ok());
        assert_eq!(normalize_currency(" Eur "), "EUR");
        assert_eq!(normalize_currency("usd"), "USD");
    }

    #[test]
    fn test_currency_format() {
        for bad in ["US", "DOLLAR", "U$D", "12A"] {
            let errors = currency_update(bad).validate().err().unwrap_or_default();
            assert_eq!(errors.field("currency").len(), 1, "{bad}");
        }
    }
}
