//! Uploaded file metadata.

use sqlx::PgPool;

use emporium_core::FileId;

use super::{Actor, ListParams, ListQuery, Page, RepositoryError, actor_id};
use crate::models::content::{FileRecord, NewFile};

const COLUMNS: &str =
    "id, original_name, stored_name, mime_type, size_bytes, sha256, uploaded_by, created_at";

pub struct FileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a file that has been written to the upload directory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, file: &NewFile, actor: Actor) -> Result<FileRecord, RepositoryError> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r"
            INSERT INTO shop.file
                (original_name, stored_name, mime_type, size_bytes, sha256,
                 uploaded_by, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $6)
            RETURNING {COLUMNS}
            "
        ))
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.sha256)
        .bind(actor_id(actor))
        .fetch_one(self.pool)
        .await?;

        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, params: &ListParams) -> Result<Page<FileRecord>, RepositoryError> {
        ListQuery::new(COLUMNS, "shop.file", params)
            .search(&["original_name", "mime_type"])
            .sortable(&[
                ("id", "id"),
                ("created_at", "created_at"),
                ("size", "size_bytes"),
            ])
            .fetch(self.pool)
            .await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: FileId) -> Result<Option<FileRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {COLUMNS} FROM shop.file WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: FileId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shop.file WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Soft-delete a file record. The bytes stay on disk.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the file does not exist.
    pub async fn delete(&self, id: FileId, actor: Actor) -> Result<(), RepositoryError> {
        super::soft_delete(self.pool, "shop.file", id.as_i32(), actor).await
    }
}
