//! Shop settings.
//!
//! `shop.settings` holds a single row. The migration only creates the table
//! shell; its setting columns are declared in [`SETTING_FIELDS`] and added by
//! [`SettingsRepository::sync_schema`] at startup when the live table lacks
//! them. Adding a setting means adding a field here and on
//! [`Settings`](crate::models::settings::Settings).

use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{Actor, RepositoryError, actor_id};
use crate::models::settings::{Settings, SettingsUpdate, normalize_currency};

/// A settings column as declared in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingField {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// SQL literal; `None` makes the column nullable.
    pub default: Option<&'static str>,
}

impl SettingField {
    const fn required(name: &'static str, sql_type: &'static str, default: &'static str) -> Self {
        Self {
            name,
            sql_type,
            default: Some(default),
        }
    }

    const fn nullable(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            default: None,
        }
    }

    /// Column definition for `ALTER TABLE ... ADD COLUMN`.
    #[must_use]
    pub fn column_definition(&self) -> String {
        match self.default {
            Some(default) => format!("{} {} NOT NULL DEFAULT {default}", self.name, self.sql_type),
            None => format!("{} {}", self.name, self.sql_type),
        }
    }
}

pub const SETTING_FIELDS: &[SettingField] = &[
    SettingField::required("shop_name", "TEXT", "'Emporium'"),
    SettingField::required("support_email", "TEXT", "''"),
    SettingField::required("currency", "TEXT", "'USD'"),
    SettingField::required("shipping_cost", "NUMERIC(12, 2)", "0"),
    SettingField::nullable("free_shipping_threshold", "NUMERIC(12, 2)"),
    SettingField::required("comments_require_approval", "BOOLEAN", "TRUE"),
];

const TABLE_SCHEMA: &str = "shop";
const TABLE_NAME: &str = "settings";

/// The select list for [`Settings`].
fn columns() -> String {
    let mut names: Vec<&str> = SETTING_FIELDS.iter().map(|f| f.name).collect();
    names.push("updated_at");
    names.join(", ")
}

/// Declared fields absent from `existing`.
fn missing_fields(existing: &[String]) -> Vec<&'static SettingField> {
    SETTING_FIELDS
        .iter()
        .filter(|f| !existing.iter().any(|c| c == f.name))
        .collect()
}

pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add every declared column the table is missing and make sure the row
    /// exists. Returns the names of the columns added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the catalog query or DDL fails.
    pub async fn sync_schema(&self) -> Result<Vec<&'static str>, RepositoryError> {
        let existing = sqlx::query_scalar::<_, String>(
            r"
            SELECT column_name::TEXT FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ",
        )
        .bind(TABLE_SCHEMA)
        .bind(TABLE_NAME)
        .fetch_all(self.pool)
        .await?;

        let missing = missing_fields(&existing);
        let mut tx = self.pool.begin().await?;
        for field in &missing {
            tracing::info!(column = field.name, "Adding settings column");
            sqlx::query(&format!(
                "ALTER TABLE {TABLE_SCHEMA}.{TABLE_NAME} ADD COLUMN IF NOT EXISTS {}",
                field.column_definition()
            ))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(&format!(
            "INSERT INTO {TABLE_SCHEMA}.{TABLE_NAME} (id) VALUES (1) ON CONFLICT (id) DO NOTHING"
        ))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(missing.iter().map(|f| f.name).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::NotFound` if the row is missing.
    pub async fn get(&self) -> Result<Settings, RepositoryError> {
        sqlx::query_as::<_, Settings>(&format!(
            "SELECT {} FROM {TABLE_SCHEMA}.{TABLE_NAME} WHERE id = 1",
            columns()
        ))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Write the fields present in `update`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        update: &SettingsUpdate,
        actor: Actor,
    ) -> Result<Settings, RepositoryError> {
        let mut qb = update_builder(update, actor);
        qb.build_query_as::<Settings>()
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

fn update_builder(update: &SettingsUpdate, actor: Actor) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "UPDATE {TABLE_SCHEMA}.{TABLE_NAME} SET updated_at = NOW(), updated_by = "
    ));
    qb.push_bind(actor_id(actor));

    if let Some(name) = &update.shop_name {
        qb.push(", shop_name = ").push_bind(name.trim().to_string());
    }
    if let Some(email) = &update.support_email {
        qb.push(", support_email = ").push_bind(email.trim().to_lowercase());
    }
    if let Some(currency) = &update.currency {
        qb.push(", currency = ").push_bind(normalize_currency(currency));
    }
    if let Some(cost) = update.shipping_cost {
        qb.push(", shipping_cost = ").push_bind(cost);
    }
    if let Some(threshold) = update.free_shipping_threshold {
        qb.push(", free_shipping_threshold = ").push_bind(threshold);
    }
    if let Some(flag) = update.comments_require_approval {
        qb.push(", comments_require_approval = ").push_bind(flag);
    }

    qb.push(" WHERE id = 1 RETURNING ").push(columns());
    qb
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_column_definition() {
        assert_eq!(
            SETTING_FIELDS[0].column_definition(),
            "shop_name TEXT NOT NULL DEFAULT 'Emporium'"
        );
        assert_eq!(
            SettingField::nullable("free_shipping_threshold", "NUMERIC(12, 2)").column_definition(),
            "free_shipping_threshold NUMERIC(12, 2)"
        );
    }

    #[test]
    fn test_missing_fields() {
        let existing = vec![
            "id".to_string(),
            "shop_name".to_string(),
            "currency".to_string(),
            "updated_at".to_string(),
        ];
        let missing: Vec<&str> = missing_fields(&existing).iter().map(|f| f.name).collect();
        assert_eq!(
            missing,
            [
                "support_email",
                "shipping_cost",
                "free_shipping_threshold",
                "comments_require_approval"
            ]
        );
    }

    #[test]
    fn test_nothing_missing_when_all_present() {
        let existing: Vec<String> = SETTING_FIELDS.iter().map(|f| f.name.to_string()).collect();
        assert!(missing_fields(&existing).is_empty());
    }

    #[test]
    fn test_update_sets_only_present_fields() {
        let update = SettingsUpdate {
            currency: Some("eur".to_string()),
            free_shipping_threshold: Some(None),
            ..SettingsUpdate::default()
        };
        let sql = update_builder(&update, None).into_sql();
        assert_eq!(
            sql,
            format!(
                "UPDATE shop.settings SET updated_at = NOW(), updated_by = $1, currency = $2, \
                 free_shipping_threshold = $3 WHERE id = 1 RETURNING {}",
                columns()
            )
        );
    }

    #[test]
    fn test_update_skips_absent_threshold() {
        let update = SettingsUpdate {
            shipping_cost: Some(Decimal::new(500, 2)),
            ..SettingsUpdate::default()
        };
        let sql = update_builder(&update, None).into_sql();
        assert!(sql.contains("shipping_cost = $2"));
        assert!(!sql.contains("free_shipping_threshold ="));
    }
}
