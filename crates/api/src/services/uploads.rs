//! Image uploads.
//!
//! Files arrive as the multipart field `file`, are checked against the image
//! allow-list by their leading bytes, and are written to the upload directory
//! as `<sha256 prefix>-<uuid>.<ext>`. The directory is served statically
//! under [`UPLOADS_ROUTE`](crate::models::content::UPLOADS_ROUTE).

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::{Actor, FileRepository, RepositoryError};
use crate::models::content::{FileRecord, NewFile};

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

const HASH_PREFIX_LEN: usize = 12;
const MAX_ORIGINAL_NAME: usize = 255;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("file exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("multipart field '{FILE_FIELD}' is missing")]
    MissingFile,

    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// An accepted image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageKind {
    /// Identify an image from its leading bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }
}

/// On-disk store for uploaded files.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_bytes: config.max_bytes,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create the upload directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if the directory cannot be created.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Read the `file` field, store it and record it.
    ///
    /// # Errors
    ///
    /// Returns an `UploadError` if the field is missing, too large, not an
    /// accepted image, or cannot be written or recorded.
    pub async fn upload(
        &self,
        pool: &PgPool,
        mut multipart: Multipart,
        actor: Actor,
    ) -> Result<FileRecord, UploadError> {
        while let Some(mut field) = multipart.next_field().await? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            let original_name = sanitize_name(field.file_name().unwrap_or(FILE_FIELD));
            let mut bytes = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                if bytes.len() + chunk.len() > self.max_bytes {
                    return Err(UploadError::TooLarge {
                        max: self.max_bytes,
                    });
                }
                bytes.extend_from_slice(&chunk);
            }

            let file = self.write(&bytes, original_name).await?;
            return self.record(pool, file, actor).await;
        }

        Err(UploadError::MissingFile)
    }

    /// Validate and write `bytes` to the upload directory.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedType` for non-images, `TooLarge` past
    /// the size cap, or `Io` if the write fails.
    pub async fn write(&self, bytes: &[u8], original_name: String) -> Result<NewFile, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::MissingFile);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
            });
        }
        let kind = ImageKind::sniff(bytes)
            .ok_or_else(|| UploadError::UnsupportedType(original_name.clone()))?;

        let sha256 = hex::encode(Sha256::digest(bytes));
        let stored_name = stored_name(&sha256, kind);
        tokio::fs::write(self.dir.join(&stored_name), bytes).await?;

        Ok(NewFile {
            original_name,
            stored_name,
            mime_type: kind.mime_type().to_string(),
            size_bytes: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            sha256,
        })
    }

    /// Insert the file row, removing the written file if that fails.
    async fn record(
        &self,
        pool: &PgPool,
        file: NewFile,
        actor: Actor,
    ) -> Result<FileRecord, UploadError> {
        match FileRepository::new(pool).create(&file, actor).await {
            Ok(record) => {
                tracing::info!(
                    file_id = %record.id,
                    stored_name = %record.stored_name,
                    size_bytes = record.size_bytes,
                    "File uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                let path = self.dir.join(&file.stored_name);
                tokio::spawn(async move {
                    if let Err(err) = tokio::fs::remove_file(&path).await {
                        tracing::warn!(
                            path = %path.display(),
                            error = %err,
                            "Failed to remove orphaned upload"
                        );
                    }
                });
                Err(e.into())
            }
        }
    }
}

fn stored_name(sha256_hex: &str, kind: ImageKind) -> String {
    let prefix = sha256_hex.get(..HASH_PREFIX_LEN).unwrap_or(sha256_hex);
    format!("{prefix}-{}.{}", Uuid::new_v4().simple(), kind.extension())
}

/// Keep the client's file name for display only: no path, no control characters.
fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_ORIGINAL_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        FILE_FIELD.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn store(dir: &Path, max_bytes: usize) -> FileStore {
        FileStore::new(&UploadConfig {
            dir: dir.to_path_buf(),
            max_bytes,
        })
    }

    #[test]
    fn test_sniff() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(PNG_HEADER), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\x10\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"%PDF-1.7"), None);
        assert_eq!(ImageKind::sniff(b""), None);
    }

    #[test]
    fn test_stored_name_format() {
        let sha = "ab".repeat(32);
        let name = stored_name(&sha, ImageKind::Webp);
        let (prefix, rest) = name.split_once('-').unwrap();
        assert_eq!(prefix, "abababababab");
        assert!(rest.ends_with(".webp"));
        assert_eq!(rest.len(), 32 + ".webp".len());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_name("C:\\photos\\cat.png"), "cat.png");
        assert_eq!(sanitize_name("bad\u{0}name.gif"), "badname.gif");
        assert_eq!(sanitize_name("/"), "file");
    }

    #[tokio::test]
    async fn test_write_stores_image() {
        let dir = tempfile::tempdir().unwrap();
        let file = store(dir.path(), 1024)
            .write(PNG_HEADER, "logo.png".to_string())
            .await
            .unwrap();

        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.size_bytes, 12);
        assert_eq!(file.sha256.len(), 64);
        assert!(file.stored_name.starts_with(&file.sha256[..HASH_PREFIX_LEN]));
        let written = tokio::fs::read(dir.path().join(&file.stored_name)).await.unwrap();
        assert_eq!(written, PNG_HEADER);
    }

    #[tokio::test]
    async fn test_write_rejects_non_images_and_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), 8);

        assert!(matches!(
            store.write(b"hello", "notes.txt".to_string()).await,
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.write(PNG_HEADER, "big.png".to_string()).await,
            Err(UploadError::TooLarge { max: 8 })
        ));
        assert!(matches!(
            store.write(b"", "empty.png".to_string()).await,
            Err(UploadError::MissingFile)
        ));
    }
}
