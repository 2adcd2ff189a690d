//! Storage for uploaded images (avatars and article illustrations).
//!
//! Files are kept under generated names so nothing from the client's
//! filename except its extension reaches the filesystem.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::body::Bytes;
use chrono::Utc;
use tracing::{debug, warn};

use crate::errors::{RequestError, RequestResult};

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// A file received in a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[axum::async_trait]
pub trait MediaStore: Send + Sync {
    /// Persists `upload` and returns the reference to keep in the database.
    async fn store(
        &self,
        upload: &Upload,
        prefix: &str,
        allowed_extensions: &[&str],
    ) -> RequestResult<String>;

    async fn delete(&self, reference: &str) -> Result<()>;
}

/// Lowercased extension of `file_name`, if it has one.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn allowed_file(file_name: &str, allowed_extensions: &[&str]) -> Option<String> {
    extension_of(file_name).filter(|ext| allowed_extensions.contains(&ext.as_str()))
}

/// Deletes a stored file, logging instead of failing.
pub async fn discard(store: &dyn MediaStore, reference: Option<&str>) {
    if let Some(reference) = reference {
        if let Err(e) = store.delete(reference).await {
            warn!("Could not remove stored media {}: {:#}", reference, e);
        }
    }
}

pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create upload directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf> {
        if reference.is_empty()
            || reference.contains(['/', '\\'])
            || reference.starts_with('.')
        {
            anyhow::bail!("Refusing to touch media reference {:?}", reference);
        }
        Ok(self.root.join(reference))
    }
}

#[axum::async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(
        &self,
        upload: &Upload,
        prefix: &str,
        allowed_extensions: &[&str],
    ) -> RequestResult<String> {
        let ext = allowed_file(&upload.file_name, allowed_extensions).ok_or_else(|| {
            RequestError::Validation(format!(
                "Unsupported file type, allowed extensions: {}",
                allowed_extensions.join(", ").to_uppercase()
            ))
        })?;
        let reference = format!(
            "{}_{}_{:08x}.{}",
            prefix,
            Utc::now().timestamp(),
            rand::random::<u32>(),
            ext
        );
        let path = self.path_for(&reference)?;
        tokio::fs::write(&path, &upload.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Stored upload {} as {}", upload.file_name, reference);
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let path = self.path_for(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png(name: &str) -> Upload {
        Upload {
            file_name: name.to_owned(),
            bytes: Bytes::from_static(b"\x89PNG fake"),
        }
    }

    async fn temp_store() -> (TempDir, LocalMediaStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::open(dir.path().join("media")).await.unwrap();
        (dir, store)
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(allowed_file("Photo.JPG", ALLOWED_IMAGE_EXTENSIONS).as_deref(), Some("jpg"));
        assert_eq!(allowed_file("archive.tar.gz", ALLOWED_IMAGE_EXTENSIONS), None);
        assert_eq!(allowed_file("noextension", ALLOWED_IMAGE_EXTENSIONS), None);
        assert_eq!(allowed_file("trailing.", ALLOWED_IMAGE_EXTENSIONS), None);
    }

    #[tokio::test]
    async fn store_then_delete_removes_the_file() {
        let (_dir, store) = temp_store().await;
        let reference = store
            .store(&png("../../etc/cat.png"), "article_1", ALLOWED_IMAGE_EXTENSIONS)
            .await
            .unwrap();
        assert!(reference.starts_with("article_1_"));
        assert!(reference.ends_with(".png"));
        let path = store.root().join(&reference);
        assert!(path.exists());

        store.delete(&reference).await.unwrap();
        assert!(!path.exists());
        // deleting twice is fine
        store.delete(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn store_lives_inside_a_removable_directory() {
        let (dir, store) = temp_store().await;
        let root = store.root().to_path_buf();
        store
            .store(&png("cat.png"), "article_1", ALLOWED_IMAGE_EXTENSIONS)
            .await
            .unwrap();
        assert!(root.starts_with(dir.path()));
        drop(dir);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn disallowed_extension_is_a_validation_error() {
        let (_dir, store) = temp_store().await;
        let result = store
            .store(&png("script.exe"), "avatar_1", ALLOWED_IMAGE_EXTENSIONS)
            .await;
        assert!(matches!(result, Err(RequestError::Validation(_))));
    }

    #[tokio::test]
    async fn references_cannot_escape_the_root() {
        let (_dir, store) = temp_store().await;
        assert!(store.delete("../secret.png").await.is_err());
        assert!(store.delete("").await.is_err());
    }
}
