//! Shipping addresses.
//!
//! A user with at least one address always has exactly one default. The
//! first address becomes the default, marking another address as default
//! clears the flag elsewhere, and deleting the default promotes the most
//! recent remaining address.

use sqlx::{PgPool, Postgres, Transaction};

use emporium_core::{AddressId, UserId};

use super::{RepositoryError, actor_id};
use crate::models::user::{Address, AddressInput};

const COLUMNS: &str = r"
    id, user_id, title, recipient, phone, province, city, street, postal_code,
    is_default, created_at, updated_at";

pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            r"
            SELECT {COLUMNS} FROM shop.address
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY is_default DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(addresses)
    }

    /// One of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {COLUMNS} FROM shop.address WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(address)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user_addresses(&mut tx, user_id).await?;

        let has_default = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.address
                WHERE user_id = $1 AND is_default AND deleted_at IS NULL
            )
            ",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let make_default = input.is_default || !has_default;
        if make_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            INSERT INTO shop.address
                (user_id, title, recipient, phone, province, city, street, postal_code,
                 is_default, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(input.title.trim())
        .bind(input.recipient.trim())
        .bind(input.phone.trim())
        .bind(input.province.trim())
        .bind(input.city.trim())
        .bind(input.street.trim())
        .bind(input.postal_code.trim())
        .bind(make_default)
        .bind(actor_id(Some(user_id)))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Replace an address. Clearing `is_default` on the default is ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user_addresses(&mut tx, user_id).await?;

        if input.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            UPDATE shop.address
            SET title = $3, recipient = $4, phone = $5, province = $6, city = $7,
                street = $8, postal_code = $9, is_default = is_default OR $10,
                updated_by = $2, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .bind(input.title.trim())
        .bind(input.recipient.trim())
        .bind(input.phone.trim())
        .bind(input.province.trim())
        .bind(input.city.trim())
        .bind(input.street.trim())
        .bind(input.postal_code.trim())
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Make an address the user's default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn set_default(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user_addresses(&mut tx, user_id).await?;
        clear_default(&mut tx, user_id).await?;

        let address = sqlx::query_as::<_, Address>(&format!(
            r"
            UPDATE shop.address SET is_default = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Soft-delete an address, promoting another one if it was the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_user_addresses(&mut tx, user_id).await?;

        let was_default = sqlx::query_scalar::<_, bool>(
            "SELECT is_default FROM shop.address WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            r"
            UPDATE shop.address SET deleted_at = NOW(), deleted_by = $2, is_default = FALSE
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if was_default {
            sqlx::query(
                r"
                UPDATE shop.address SET is_default = TRUE
                WHERE id = (
                    SELECT id FROM shop.address
                    WHERE user_id = $1 AND deleted_at IS NULL
                    ORDER BY id DESC LIMIT 1
                )
                ",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Serialize default-address changes per user.
async fn lock_user_addresses(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT id FROM shop.user WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn clear_default(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE shop.address SET is_default = FALSE WHERE user_id = $1 AND is_default AND deleted_at IS NULL",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
