//! User repository.
//!
//! Users are always loaded together with their role so authorization checks
//! need a single query per request.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use emporium_core::{Email, RoleId, UserId};

use super::query::FilterValue;
use super::roles::parse_permissions;
use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::user::{ProfileInput, RoleSummary, User};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role_id: i32,
    role_code: String,
    is_admin: bool,
    permissions: Vec<String>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            role: RoleSummary {
                id: RoleId::new(row.role_id),
                code: row.role_code,
                is_admin: row.is_admin,
                permissions: parse_permissions(&row.permissions)?,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

const COLUMNS: &str = r"
    u.id, u.email, u.first_name, u.last_name, u.phone, u.is_active,
    u.created_at, u.updated_at,
    r.id AS role_id, r.code AS role_code, r.is_admin, r.permissions";

const FROM: &str = "shop.user u JOIN shop.role r ON r.id = u.role_id";

/// Filters accepted by [`UserRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct UserFilter {
    pub role_id: Option<RoleId>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List live users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is invalid.
    pub async fn list(
        &self,
        params: &ListParams,
        filter: UserFilter,
    ) -> Result<Page<User>, RepositoryError> {
        ListQuery::new(COLUMNS, FROM, params)
            .soft_delete("u.deleted_at")
            .search(&["u.email", "u.first_name", "u.last_name", "u.phone"])
            .sortable(&[
                ("id", "u.id"),
                ("email", "u.email"),
                ("created_at", "u.created_at"),
            ])
            .default_order("u.id DESC")
            .filter("u.role_id", filter.role_id.map(|id| FilterValue::Int(id.as_i32())))
            .filter("u.is_active", filter.is_active.map(FilterValue::Bool))
            .fetch::<UserRow>(self.pool)
            .await?
            .try_map(TryInto::try_into)
    }

    /// Get a live user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE u.id = $1 AND u.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a live user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialsRow>(&format!(
            r"
            SELECT {COLUMNS}, u.password_hash
            FROM {FROM}
            WHERE u.email = $1 AND u.deleted_at IS NULL
            "
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|row| Ok((row.user.try_into()?, row.password_hash)))
            .transpose()
    }

    /// Password hash of a live user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM shop.user WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(hash)
    }

    /// Create a user holding the role with `role_code`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    /// Returns `RepositoryError::NotFound` if the role does not exist.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        role_code: &str,
        actor: Actor,
    ) -> Result<User, RepositoryError> {
        let id = sqlx::query_scalar::<_, UserId>(
            r"
            INSERT INTO shop.user
                (email, password_hash, first_name, last_name, role_id, created_by, updated_by)
            SELECT $1, $2, $3, $4, r.id, $6, $6
            FROM shop.role r
            WHERE r.code = $5 AND r.deleted_at IS NULL
            RETURNING id
            ",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .bind(first_name.trim())
        .bind(last_name.trim())
        .bind(role_code)
        .bind(actor_id(actor))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_EMAIL))?
        .ok_or(RepositoryError::NotFound)?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update a user's own profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        input: &ProfileInput,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.user
            SET first_name = $2, last_name = $3, phone = $4, updated_by = $1, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password(
        &self,
        id: UserId,
        password_hash: &str,
        actor: Actor,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.user SET password_hash = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(password_hash)
        .bind(actor_id(actor))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Assign a role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user or role does not exist.
    pub async fn set_role(
        &self,
        id: UserId,
        role_id: RoleId,
        actor: Actor,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.user u SET role_id = r.id, updated_by = $3, updated_at = NOW()
            FROM shop.role r
            WHERE u.id = $1 AND u.deleted_at IS NULL
              AND r.id = $2 AND r.deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(role_id)
        .bind(actor_id(actor))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Activate or deactivate a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_active(
        &self,
        id: UserId,
        is_active: bool,
        actor: Actor,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.user SET is_active = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(id)
        .bind(is_active)
        .bind(actor_id(actor))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId, actor: Actor) -> Result<(), RepositoryError> {
        super::soft_delete(self.pool, "shop.user", id.as_i32(), actor).await
    }
}
