//! Uploaded files, app pictures, comments and favorites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{AppPicId, AppPicKind, CommentId, CommentStatus, FileId, ProductId, UserId};

use crate::validation::{Validate, ValidationErrors};

/// Route uploaded files are served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Public path of a stored file.
#[must_use]
pub fn public_path(stored_name: &str) -> String {
    format!("{UPLOADS_ROUTE}/{stored_name}")
}

// =============================================================================
// Files
// =============================================================================

/// Metadata of an uploaded file.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: FileId,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A file that has been written to disk but not yet recorded.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub sha256: String,
}

// =============================================================================
// App Pictures
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AppPic {
    pub id: AppPicId,
    pub file_id: FileId,
    pub title: String,
    pub link: Option<String>,
    pub kind: AppPicKind,
    pub priority: i32,
    pub is_active: bool,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppPicInput {
    pub file_id: FileId,
    pub title: String,
    pub link: Option<String>,
    pub kind: AppPicKind,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for AppPicInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("title", &self.title, 128);
        errors.optional_text("link", self.link.as_deref(), 2048);
        errors.into_result()
    }
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Comments
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: UserId,
    /// Display name of the author.
    pub author: String,
    pub product_id: ProductId,
    pub body: String,
    pub rating: i16,
    pub status: CommentStatus,
    pub reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
    pub product_id: ProductId,
    pub body: String,
    pub rating: i16,
}

impl Validate for CommentInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("body", &self.body, 2000);
        errors.in_range("rating", i64::from(self.rating), 1, 5);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentReplyInput {
    pub reply: String,
}

impl Validate for CommentReplyInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require_text("reply", &self.reply, 2000);
        errors.into_result()
    }
}

/// Moderation decision on a comment.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CommentStatusInput {
    pub status: CommentStatus,
}

impl Validate for CommentStatusInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

// =============================================================================
// Favorites
// =============================================================================

/// A product on a user's favorites list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Favorite {
    pub product_id: ProductId,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_path() {
        assert_eq!(public_path("ab12cd34-x.png"), "/uploads/ab12cd34-x.png");
    }

    #[test]
    fn test_comment_rating_bounds() {
        let mut input = CommentInput {
            product_id: ProductId::new(1),
            body: "Fits well".to_string(),
            rating: 0,
        };
        assert!(input.validate().is_err());
        input.rating = 6;
        assert!(input.validate().is_err());
        input.rating = 5;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_comment_body_required() {
        let input = CommentInput {
            product_id: ProductId::new(1),
            body: "  ".to_string(),
            rating: 4,
        };
        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.field("body"), ["is required"]);
    }
}
