//! Catalog domain types: brands, categories, colors, features, products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{
    BrandId, CategoryId, ColorId, FeatureId, FileId, ProductId, ProductItemId, ProductPicId,
};

use crate::validation::{Validate, ValidationErrors, normalize_code};

const NAME_MAX: usize = 128;
const DESCRIPTION_MAX: usize = 4000;

// =============================================================================
// Brands
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub logo_file_id: Option<FileId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub logo_file_id: Option<FileId>,
}

impl Validate for BrandInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, NAME_MAX);
        errors.require_code("code", &normalize_code(&self.code));
        errors.optional_text("description", self.description.as_deref(), DESCRIPTION_MAX);
        errors.into_result()
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub code: String,
    pub parent_id: Option<CategoryId>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub code: String,
    pub parent_id: Option<CategoryId>,
    pub description: Option<String>,
}

impl Validate for CategoryInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, NAME_MAX);
        errors.require_code("code", &normalize_code(&self.code));
        errors.optional_text("description", self.description.as_deref(), DESCRIPTION_MAX);
        errors.into_result()
    }
}

// =============================================================================
// Colors
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Color {
    pub id: ColorId,
    pub name: String,
    pub code: String,
    pub hex: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorInput {
    pub name: String,
    pub code: String,
    /// `#RRGGBB`
    pub hex: String,
}

impl Validate for ColorInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, NAME_MAX);
        errors.require_code("code", &normalize_code(&self.code));
        if !is_hex_color(&self.hex) {
            errors.add("hex", "must look like #1A2B3C");
        }
        errors.into_result()
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|digits| digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()))
}

// =============================================================================
// Features
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Feature {
    pub id: FeatureId,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureInput {
    pub name: String,
    pub code: String,
}

impl Validate for FeatureInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, NAME_MAX);
        errors.require_code("code", &normalize_code(&self.code));
        errors.into_result()
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product as shown in lists, with brand and category names joined in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub brand_id: BrandId,
    pub brand_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub is_active: bool,
    /// Lowest price among active items, if any.
    pub min_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product's value for one feature.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductFeatureValue {
    pub feature_id: FeatureId,
    pub name: String,
    pub code: String,
    pub value: String,
}

/// Product detail page: the product plus its items, features and pictures.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub items: Vec<ProductItem>,
    pub features: Vec<ProductFeatureValue>,
    pub pics: Vec<ProductPic>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureValueInput {
    pub feature_id: FeatureId,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub brand_id: BrandId,
    pub category_id: CategoryId,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Replaces the product's feature values.
    #[serde(default)]
    pub features: Vec<FeatureValueInput>,
}

impl Validate for ProductInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("name", &self.name, NAME_MAX);
        errors.require_code("code", &normalize_code(&self.code));
        errors.optional_text("description", self.description.as_deref(), DESCRIPTION_MAX);

        let mut seen = std::collections::HashSet::new();
        for feature in &self.features {
            if !seen.insert(feature.feature_id) {
                errors.add("features", format!("feature {} is listed twice", feature.feature_id));
            }
            if feature.value.trim().is_empty() {
                errors.add("features", format!("feature {} needs a value", feature.feature_id));
            }
        }
        errors.into_result()
    }
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Product Items
// =============================================================================

/// A purchasable variant of a product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductItem {
    pub id: ProductItemId,
    pub product_id: ProductId,
    pub color_id: Option<ColorId>,
    pub color_name: Option<String>,
    pub sku: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductItemInput {
    pub product_id: ProductId,
    pub color_id: Option<ColorId>,
    pub sku: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for ProductItemInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_code("sku", &normalize_code(&self.sku));
        errors.non_negative("price", self.price);
        if self.price.scale() > 2 {
            errors.add("price", "must have at most two decimal places");
        }
        errors.in_range("stock", i64::from(self.stock), 0, i64::from(i32::MAX));
        errors.into_result()
    }
}

// =============================================================================
// Product Pictures
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProductPic {
    pub id: ProductPicId,
    pub product_id: ProductId,
    pub file_id: FileId,
    pub priority: i32,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachPicInput {
    pub file_id: FileId,
}

impl Validate for AttachPicInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// New display order: every picture id exactly once.
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderInput {
    pub ids: Vec<i32>,
}

impl Validate for ReorderInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.ids.is_empty() {
            return Err(ValidationErrors::single("ids", "is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#1a2B3c"));
        assert!(!is_hex_color("1a2b3c"));
        assert!(!is_hex_color("#1a2b3"));
        assert!(!is_hex_color("#1a2b3g"));
    }

    #[test]
    fn test_product_input_rejects_duplicate_features() {
        let input = ProductInput {
            name: "Air Max".to_string(),
            code: "air-max".to_string(),
            description: None,
            brand_id: BrandId::new(1),
            category_id: CategoryId::new(1),
            is_active: true,
            features: vec![
                FeatureValueInput {
                    feature_id: FeatureId::new(4),
                    value: "Leather".to_string(),
                },
                FeatureValueInput {
                    feature_id: FeatureId::new(4),
                    value: "Mesh".to_string(),
                },
            ],
        };
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("features").len(), 1);
    }

    #[test]
    fn test_item_price_checks() {
        let mut input = ProductItemInput {
            product_id: ProductId::new(1),
            color_id: None,
            sku: "AM-RED-42".to_string(),
            price: Decimal::new(-100, 2),
            stock: 3,
            is_active: true,
        };
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("price"), ["must not be negative"]);

        input.price = Decimal::new(19_999, 3);
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("price"), ["must have at most two decimal places"]);

        input.price = Decimal::new(1999, 2);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_code_is_checked_after_normalizing() {
        let input = FeatureInput {
            name: "Material".to_string(),
            code: "  material ".to_string(),
        };
        assert!(input.validate().is_ok());
    }
}
