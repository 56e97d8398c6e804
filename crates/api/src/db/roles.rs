//! Role repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use emporium_core::{Permission, RoleId};

use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::user::{CUSTOMER_ROLE, Role, RoleInput, SUPER_ADMIN_ROLE};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i32,
    name: String,
    code: String,
    permissions: Vec<String>,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoleId::new(row.id),
            name: row.name,
            code: row.code,
            permissions: parse_permissions(&row.permissions)?,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Parse stored permission names.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` on an unknown name.
pub fn parse_permissions(names: &[String]) -> Result<Vec<Permission>, RepositoryError> {
    names
        .iter()
        .map(|name| {
            name.parse().map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid permission in database: {e}"))
            })
        })
        .collect()
}

fn permission_names(permissions: &[Permission]) -> Vec<String> {
    permissions.iter().map(ToString::to_string).collect()
}

const COLUMNS: &str = "id, name, code, permissions, is_admin, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

pub struct RoleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored permission is unknown.
    pub async fn list(&self, params: &ListParams) -> Result<Page<Role>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.role", params)
            .search(&["name", "code"])
            .sortable(&[("id", "id"), ("name", "name"), ("code", "code")])
            .default_order("id")
            .fetch::<RoleRow>(self.pool)
            .await?
            .try_map(TryInto::try_into)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored permission is unknown.
    pub async fn get(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {COLUMNS} FROM shop.role WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored permission is unknown.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {COLUMNS} FROM shop.role WHERE code = $1 AND deleted_at IS NULL"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, input: &RoleInput, actor: Actor) -> Result<Role, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            r"
            INSERT INTO shop.role (name, code, permissions, is_admin, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {COLUMNS}
            "
        ))
        .bind(input.name.trim())
        .bind(input.code.trim())
        .bind(permission_names(&input.parsed_permissions()))
        .bind(input.is_admin)
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?;

        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the role does not exist.
    /// Returns `RepositoryError::Conflict` if the code belongs to another role.
    pub async fn update(
        &self,
        id: RoleId,
        input: &RoleInput,
        actor: Actor,
    ) -> Result<Role, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            r"
            UPDATE shop.role
            SET name = $2, code = $3, permissions = $4, is_admin = $5,
                updated_by = $6, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.code.trim())
        .bind(permission_names(&input.parsed_permissions()))
        .bind(input.is_admin)
        .bind(actor_id(actor))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Soft-delete a role that no live user holds. Built-in roles are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the role does not exist.
    /// Returns `RepositoryError::Conflict` if the role is built in or assigned.
    pub async fn delete(&self, id: RoleId, actor: Actor) -> Result<(), RepositoryError> {
        let in_use = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM shop.role WHERE id = $1 AND code = ANY($2)
            ) OR EXISTS (
                SELECT 1 FROM shop.user WHERE role_id = $1 AND deleted_at IS NULL
            )
            ",
        )
        .bind(id)
        .bind(&[SUPER_ADMIN_ROLE, CUSTOMER_ROLE][..])
        .fetch_one(self.pool)
        .await?;

        if in_use {
            return Err(RepositoryError::Conflict(messages::IN_USE.to_string()));
        }

        super::soft_delete(self.pool, "shop.role", id.as_i32(), actor).await
    }

    /// Make sure the built-in roles exist; returns how many were created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn ensure_builtin(&self) -> Result<u64, RepositoryError> {
        let mut created = 0;
        for (name, code, permissions, is_admin) in [
            ("Super Admin", SUPER_ADMIN_ROLE, vec![Permission::All], true),
            ("Customer", CUSTOMER_ROLE, Vec::new(), false),
        ] {
            let result = sqlx::query(
                r"
                INSERT INTO shop.role (name, code, permissions, is_admin)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (code) WHERE deleted_at IS NULL DO NOTHING
                ",
            )
            .bind(name)
            .bind(code)
            .bind(permission_names(&permissions))
            .bind(is_admin)
            .execute(self.pool)
            .await?;

            created += result.rows_affected();
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permissions() {
        let parsed = parse_permissions(&["all".to_string(), "manage_orders".to_string()]);
        assert!(matches!(
            parsed.as_deref(),
            Ok([Permission::All, Permission::ManageOrders])
        ));
    }

    #[test]
    fn test_unknown_permission_is_corruption() {
        let parsed = parse_permissions(&["root".to_string()]);
        assert!(matches!(parsed, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_permission_names() {
        assert_eq!(
            permission_names(&[Permission::ManageCatalog]),
            vec!["manage_catalog".to_string()]
        );
    }
}
