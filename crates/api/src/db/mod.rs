//! Database operations for the `shop` schema.
//!
//! # Tables
//!
//! - `role`, `user`, `address` - accounts and authorization
//! - `brand`, `category`, `color`, `feature`, `product`, `product_feature`,
//!   `product_item`, `product_pic` - catalog
//! - `file`, `app_pic` - uploads and storefront pictures
//! - `discount`, `order`, `order_item` - checkout
//! - `comment`, `favorite` - user content
//! - `settings` - single row, columns bound at runtime (see [`settings`])
//!
//! Every entity table carries audit columns (`created_by`, `updated_by`,
//! `deleted_by`) and is soft-deleted through `deleted_at`. Repositories only
//! ever return live rows.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

pub mod addresses;
pub mod app_pics;
pub mod brands;
pub mod categories;
pub mod colors;
pub mod comments;
pub mod discounts;
pub mod favorites;
pub mod features;
pub mod files;
pub mod orders;
pub mod product_items;
pub mod product_pics;
pub mod products;
pub mod query;
pub mod roles;
pub mod settings;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::UserId;

pub use addresses::AddressRepository;
pub use app_pics::AppPicRepository;
pub use brands::BrandRepository;
pub use categories::CategoryRepository;
pub use colors::ColorRepository;
pub use comments::CommentRepository;
pub use discounts::DiscountRepository;
pub use favorites::FavoriteRepository;
pub use features::FeatureRepository;
pub use files::FileRepository;
pub use orders::OrderRepository;
pub use product_items::ProductItemRepository;
pub use product_pics::ProductPicRepository;
pub use products::ProductRepository;
pub use query::{ListParams, ListQuery, Page};
pub use roles::RoleRepository;
pub use settings::SettingsRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique code).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// One failure handed to several waiters of a cached load.
    #[error(transparent)]
    Shared(std::sync::Arc<RepositoryError>),
}

impl RepositoryError {
    /// Convert a unique-violation into `Conflict(message)`, keeping other errors.
    #[must_use]
    pub fn on_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }

    /// Convert a foreign-key violation into `Conflict(message)`, keeping other errors.
    #[must_use]
    pub fn on_foreign_key(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// The user performing a write, recorded in the audit columns.
///
/// `None` is used by system tasks (CLI seeding, migrations).
pub type Actor = Option<UserId>;

/// Bindable form of an [`Actor`].
#[must_use]
pub fn actor_id(actor: Actor) -> Option<i32> {
    actor.map(|id| id.as_i32())
}

/// Whether `requested` names every id in `current` exactly once.
#[must_use]
pub fn is_permutation(current: &[i32], requested: &[i32]) -> bool {
    if current.len() != requested.len() {
        return false;
    }
    let mut current = current.to_vec();
    let mut requested = requested.to_vec();
    current.sort_unstable();
    requested.sort_unstable();
    current == requested
}

/// Soft-delete a live row of an audited table.
///
/// `table` is always a literal from this module's repositories.
async fn soft_delete(
    pool: &PgPool,
    table: &'static str,
    id: i32,
    actor: Actor,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(&format!(
        "UPDATE {table} SET deleted_at = NOW(), deleted_by = $2 WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .bind(actor_id(actor))
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations from `crates/api/migrations`.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation_accepts_reordering() {
        assert!(is_permutation(&[4, 7, 9], &[9, 4, 7]));
    }

    #[test]
    fn test_permutation_rejects_missing_extra_or_duplicate() {
        assert!(!is_permutation(&[4, 7, 9], &[9, 4]));
        assert!(!is_permutation(&[4, 7], &[4, 7, 11]));
        assert!(!is_permutation(&[4, 7, 9], &[4, 4, 9]));
    }

    #[test]
    fn test_unique_violation_passthrough() {
        let err = RepositoryError::on_unique(sqlx::Error::RowNotFound, "taken");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
