use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::{public_url, validate_name, AssetStore};
use crate::error::StoreError;

/// Directory-backed store whose files are served by a web server at
/// `public_base`.
pub struct FsStore {
    root: PathBuf,
    base: String,
}

impl FsStore {
    /// Store files in `root`, served at `public_base`.
    ///
    /// The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl AssetStore for FsStore {
    fn public_base(&self) -> &str {
        &self.base
    }

    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StoreError> {
        validate_name(name)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::io_error(&self.root, e))?;

        // Publish a private temp file by hard link: the link fails if `dest`
        // exists, and readers never see a partial file.
        let dest = self.root.join(name);
        let tmp = self.root.join(format!(".{name}.{}.part", Uuid::now_v7()));
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Self::io_error(&tmp, e));
        }
        let linked = tokio::fs::hard_link(&tmp, &dest).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Rejected {
                    name: name.to_string(),
                    detail: "object already exists".to_string(),
                });
            }
            Err(e) => return Err(Self::io_error(&dest, e)),
        }

        debug!("Stored {} bytes at {}", bytes.len(), dest.display());
        Ok(public_url(&self.base, name))
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        let name = self.object_name(url)?;
        validate_name(&name)?;
        let path = self.root.join(&name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}
