//! Request validation.
//!
//! Request bodies implement [`Validate`] and are extracted with [`ValidJson`],
//! which rejects malformed JSON with 400 and failed checks with 422 carrying
//! per-field messages. [`Path`] and [`Query`] wrap the axum extractors so a
//! malformed id or query string also answers with the JSON error body.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
};
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, messages};

/// Field name -> list of problems with that field.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Build an error set with a single entry.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Require a non-blank string no longer than `max` characters.
    pub fn require_text(&mut self, field: &str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        } else if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    /// Check an optional string's length when present.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value
            && v.chars().count() > max
        {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    /// Require a catalog code: 1-64 characters of `A-Z`, `0-9`, `-` or `_`.
    pub fn require_code(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.add(field, "is required");
        } else if value.len() > 64
            || !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.add(
                field,
                "may only contain letters, digits, '-' and '_' (max 64)",
            );
        }
    }

    /// Require an amount that is zero or more.
    pub fn non_negative(&mut self, field: &str, value: Decimal) {
        if value.is_sign_negative() {
            self.add(field, "must not be negative");
        }
    }

    /// Require an integer within `min..=max`.
    pub fn in_range(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.add(field, format!("must be between {min} and {max}"));
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Normalize a user-supplied catalog code (trimmed, uppercase).
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// A request body that can check its own invariants.
pub trait Validate {
    /// # Errors
    ///
    /// Returns every field that failed validation.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// JSON extractor that runs [`Validate`] after deserializing.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                tracing::debug!(error = %rejection, "Rejected request body");
                AppError::BadRequest(messages::INVALID_BODY.to_string())
            })?;

        value.validate().map_err(AppError::Validation)?;
        Ok(Self(value))
    }
}

/// Path parameters, rejected as [`AppError::BadRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// Query string, rejected as [`AppError::BadRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", "   ", 10);
        errors.require_text("title", "abcdefghijk", 10);
        errors.require_text("ok", "fine", 10);
        assert_eq!(errors.field("name"), ["is required"]);
        assert_eq!(errors.field("title"), ["must be at most 10 characters"]);
        assert!(errors.field("ok").is_empty());
    }

    #[test]
    fn test_require_code() {
        let mut errors = ValidationErrors::new();
        errors.require_code("a", "NIKE_AIR-1");
        assert!(errors.is_empty());
        errors.require_code("b", "has space");
        errors.require_code("c", "");
        assert_eq!(errors.field("b").len(), 1);
        assert_eq!(errors.field("c"), ["is required"]);
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(ValidationErrors::single("x", "bad").into_result().is_err());
    }

    #[test]
    fn test_serializes_as_map() {
        let errors = ValidationErrors::single("rating", "must be between 1 and 5");
        let json = serde_json::to_value(&errors).unwrap_or_default();
        assert_eq!(json["rating"][0], "must be between 1 and 5");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  nike "), "NIKE");
    }
}
