//! Filesystem-backed binary storage.

use std::path::PathBuf;

use async_trait::async_trait;
use forms::{BinaryData, BinaryStorage, FormError};
use tracing::debug;
use uuid::Uuid;

/// Prefix of the ids handed out by [`FilesystemStorage`].
pub const FILESYSTEM_ID_PREFIX: &str = "filesystem";

/// Copies uploads into `root`, each under a fresh UUID.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of a stored file, if `id` was issued by this storage.
    pub fn path_of(&self, id: &str) -> Option<PathBuf> {
        id.strip_prefix(FILESYSTEM_ID_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|name| self.root.join(name))
    }
}

#[async_trait]
impl BinaryStorage for FilesystemStorage {
    async fn copy_binary_file(
        &self,
        path: &str,
        file_name: &str,
        mime_type: &str,
    ) -> Result<BinaryData, FormError> {
        let storage_error = |e: std::io::Error| FormError::Storage {
            file_name: file_name.to_string(),
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(&self.root).await.map_err(storage_error)?;

        let name = Uuid::new_v4().to_string();
        let target = self.root.join(&name);
        let file_size = tokio::fs::copy(path, &target).await.map_err(storage_error)?;

        debug!("stored upload '{}' ({} bytes) at {}", file_name, file_size, target.display());

        Ok(BinaryData {
            id: format!("{FILESYSTEM_ID_PREFIX}:{name}"),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_upload_into_root() {
        let uploads = tempfile::tempdir().unwrap();
        let source = uploads.path().join("upload.tmp");
        tokio::fs::write(&source, b"hello").await.unwrap();

        let store_dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(store_dir.path().join("binary"));

        let stored = storage
            .copy_binary_file(source.to_str().unwrap(), "hello.txt", "text/plain")
            .await
            .expect("copy succeeds");

        assert_eq!(stored.file_name, "hello.txt");
        assert_eq!(stored.mime_type, "text/plain");
        assert_eq!(stored.file_size, 5);

        let copied = storage.path_of(&stored.id).expect("id issued by this storage");
        assert_eq!(tokio::fs::read(copied).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn missing_source_is_a_storage_error() {
        let store_dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(store_dir.path());

        let result = storage
            .copy_binary_file("/definitely/not/here", "gone.pdf", "application/pdf")
            .await;

        assert!(matches!(result, Err(FormError::Storage { file_name, .. }) if file_name == "gone.pdf"));
    }

    #[test]
    fn foreign_ids_have_no_path() {
        let storage = FilesystemStorage::new("/data");
        assert_eq!(storage.path_of("s3:abc"), None);
        assert_eq!(storage.path_of("filesystem:abc"), Some(PathBuf::from("/data/abc")));
    }
}
