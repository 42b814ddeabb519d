use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use crate::usecases::contracts::{BlobStore, UploadError};

/// Blob store rooted in a local directory, addressed by relative keys.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !valid {
            return Err(UploadError::InvalidKey {
                key: key.to_owned(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put_file(&self, key: &str, source: &Path) -> Result<(), UploadError> {
        let target = self.blob_path(key)?;

        let bytes = tokio::fs::read(source)
            .await
            .map_err(|error| UploadError::SourceUnreadable {
                details: format!("{}: {error}", source.display()),
            })?;

        let write_failed = |error: std::io::Error| UploadError::WriteFailed {
            details: format!("{}: {error}", target.display()),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(write_failed)?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(write_failed)?;

        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, UploadError> {
        let path = self.blob_path(key)?;

        let absolute = tokio::fs::canonicalize(&path)
            .await
            .map_err(|_| UploadError::NotFound {
                key: key.to_owned(),
            })?;

        Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|()| UploadError::InvalidKey {
                key: key.to_owned(),
            })
    }
}
