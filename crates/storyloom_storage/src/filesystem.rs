//! Filesystem artifact storage.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use storyloom_error::{StorageError, StorageErrorKind};
use storyloom_interface::ArtifactStore;

/// Filesystem artifact store.
///
/// A suggested name such as `item/audio/segment-0003.wav` is stored as
/// `{base}/item/audio/segment-0003-{hash[0:12]}.wav`, where the hash is the
/// SHA-256 of the content. Saving identical bytes under the same name is a no-op
/// that returns the existing path.
///
/// Writes go to a temp file that is renamed into place, so readers never see a
/// partial artifact.
#[derive(Debug, Clone)]
pub struct FileSystemArtifactStore {
    base_path: PathBuf,
}

impl FileSystemArtifactStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Created artifact storage");
        Ok(Self { base_path })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Resolve a suggested name to a content-tagged path under the base.
    fn path_for(&self, suggested_name: &str, hash: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(suggested_name);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || suggested_name.is_empty() {
            return Err(StorageError::new(StorageErrorKind::InvalidPath(
                suggested_name.to_string(),
            )));
        }

        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "artifact".to_string());
        let file_name = match relative.extension() {
            Some(ext) => format!("{}-{}.{}", stem, &hash[..12], ext.to_string_lossy()),
            None => format!("{}-{}", stem, &hash[..12]),
        };

        let dir = relative.parent().unwrap_or_else(|| Path::new(""));
        Ok(self.base_path.join(dir).join(file_name))
    }

    fn ensure_inside(&self, path: &Path) -> Result<(), StorageError> {
        if path.starts_with(&self.base_path) {
            Ok(())
        } else {
            Err(StorageError::new(StorageErrorKind::InvalidPath(format!(
                "{} is outside {}",
                path.display(),
                self.base_path.display()
            ))))
        }
    }
}

#[async_trait]
impl ArtifactStore for FileSystemArtifactStore {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, StorageError> {
        let hash = Self::compute_hash(bytes);
        let path = self.path_for(suggested_name, &hash)?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "Artifact already stored");
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, bytes).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::info!(path = %path.display(), size = bytes.len(), "Stored artifact");
        Ok(path)
    }

    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        self.ensure_inside(path)?;
        tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(path.display().to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })
    }

    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        self.ensure_inside(path)?;
        tokio::fs::remove_file(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(path.display().to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileDelete(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        tracing::info!(path = %path.display(), "Deleted artifact");
        Ok(())
    }
}
