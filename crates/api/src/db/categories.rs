//! Category repository.
//!
//! Categories form a tree through `parent_id`. The tree is kept acyclic:
//! a category can be neither its own parent nor a child of its descendants.

use sqlx::PgPool;

use emporium_core::CategoryId;

use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::error::messages;
use crate::models::catalog::{Category, CategoryInput};
use crate::validation::normalize_code;

const COLUMNS: &str = "id, name, code, parent_id, description, created_at, updated_at";

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

/// Filters accepted by [`CategoryRepository::list`].
#[derive(Debug, Default, Clone, Copy, serde::Deserialize)]
pub struct CategoryFilter {
    pub parent_id: Option<CategoryId>,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        params: &ListParams,
        filter: CategoryFilter,
    ) -> Result<Page<Category>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.category", params)
            .search(&["name", "code"])
            .sortable(&[("id", "id"), ("name", "name"), ("code", "code")])
            .filter(
                "parent_id",
                filter.parent_id.map(|id| super::query::FilterValue::Int(id.as_i32())),
            )
            .fetch(self.pool)
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {COLUMNS} FROM shop.category WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shop.category WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Whether `candidate` is `id` itself or one of its descendants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_in_subtree(
        &self,
        id: CategoryId,
        candidate: CategoryId,
    ) -> Result<bool, RepositoryError> {
        let found = sqlx::query_scalar::<_, bool>(
            r"
            WITH RECURSIVE subtree AS (
                SELECT id FROM shop.category WHERE id = $1
                UNION
                SELECT c.id FROM shop.category c
                JOIN subtree s ON c.parent_id = s.id
                WHERE c.deleted_at IS NULL
            )
            SELECT EXISTS (SELECT 1 FROM subtree WHERE id = $2)
            ",
        )
        .bind(id)
        .bind(candidate)
        .fetch_one(self.pool)
        .await?;

        Ok(found)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(
        &self,
        input: &CategoryInput,
        actor: Actor,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            INSERT INTO shop.category (name, code, parent_id, description, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {COLUMNS}
            "
        ))
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.parent_id)
        .bind(input.description.as_deref())
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the code belongs to another category.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
        actor: Actor,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            r"
            UPDATE shop.category
            SET name = $2, code = $3, parent_id = $4, description = $5,
                updated_by = $6, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(normalize_code(&input.code))
        .bind(input.parent_id)
        .bind(input.description.as_deref())
        .bind(actor_id(actor))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, messages::EXISTED_CODE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Soft-delete a category with no live children or products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if it is still referenced.
    pub async fn delete(&self, id: CategoryId, actor: Actor) -> Result<(), RepositoryError> {
        let in_use = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (SELECT 1 FROM shop.category WHERE parent_id = $1 AND deleted_at IS NULL)
                OR EXISTS (SELECT 1 FROM shop.product WHERE category_id = $1 AND deleted_at IS NULL)
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        if in_use {
            return Err(RepositoryError::Conflict(messages::IN_USE.to_string()));
        }

        super::soft_delete(self.pool, "shop.category", id.as_i32(), actor).await
    }
}
