//! File storage abstraction for idea attachments.

use std::path::PathBuf;

use crate::{AppError, AppResult};

/// Stored file metadata.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Storage key, relative to the storage root.
    pub key: String,
    /// File size in bytes.
    pub size: u64,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write a file under `key`, creating parent directories as needed.
    async fn put(&self, key: &str, data: &[u8]) -> AppResult<StoredFile>;

    /// Read a whole file.
    async fn get(&self, key: &str) -> AppResult<Vec<u8>>;

    /// Delete a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend rooted at `base_path`.
    #[must_use]
    pub const fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(AppError::Storage(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, key: &str, data: &[u8]) -> AppResult<StoredFile> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        Ok(StoredFile {
            key: key.to_string(),
            size: data.len() as u64,
        })
    }

    async fn get(&self, key: &str) -> AppResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("File not found on disk".to_string()))
            }
            Err(e) => Err(AppError::Storage(format!("Failed to read file: {e}"))),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }
}

/// Longest extension kept, without the dot.
const MAX_EXTENSION_LENGTH: usize = 10;

/// Extract a lowercase extension including the leading dot, or an empty string.
///
/// Only ASCII alphanumeric extensions are kept, so the result is always safe
/// to append to a generated file name.
#[must_use]
pub fn file_extension(original_name: &str) -> String {
    original_name
        .rsplit_once('.')
        .filter(|(stem, ext)| {
            !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Storage key for an attachment: `{idea_id}/{stored_name}`.
#[must_use]
pub fn attachment_key(idea_id: &str, stored_name: &str) -> String {
    format!("{idea_id}/{stored_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.PDF"), ".pdf");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".hidden"), "");
        assert_eq!(file_extension("trailing."), "");
    }

    #[test]
    fn test_file_extension_drops_path_characters() {
        assert_eq!(file_extension("a./x"), "");
        assert_eq!(file_extension("a.\\x"), "");
        assert_eq!(file_extension("notes.t x t"), "");
        assert_eq!(file_extension("docs/plan.Docx"), ".docx");

        let key = attachment_key("idea1", &format!("abc{}", file_extension("a./x")));
        assert_eq!(key.matches('/').count(), 1);
    }

    #[test]
    fn test_attachment_key() {
        assert_eq!(attachment_key("idea1", "abc.png"), "idea1/abc.png");
    }

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("ideaboard-test-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone());

        let stored = storage.put("idea1/file.txt", b"hello").await.unwrap();
        assert_eq!(stored.size, 5);
        assert_eq!(storage.get("idea1/file.txt").await.unwrap(), b"hello");

        storage.delete("idea1/file.txt").await.unwrap();
        assert!(matches!(
            storage.get("idea1/file.txt").await,
            Err(AppError::NotFound(_))
        ));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let storage = LocalStorage::new(PathBuf::from("/tmp"));
        assert!(storage.get("../etc/passwd").await.is_err());
    }
}
