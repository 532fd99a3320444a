//! Local filesystem secret store.
//!
//! The plain persistent backend used where no OS secret service exists. All
//! keys live in one JSON document; every update rewrites the document to a
//! temporary file and renames it over the original, so a crash or a failed
//! write never leaves a half-updated credential set behind.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

use crate::provider::{SecretStore, StoreOp};
use vaultgate_common::{Error, Result};

/// JSON-file backed store.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a store at `path`.
    ///
    /// # Preconditions
    /// - `path` names a file; its parent directory is created on first write
    ///
    /// # Postconditions
    /// - No file is created until the first write
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(Error::Config(format!(
                "File store path has no file name: {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Serialization(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let bytes =
            serde_json::to_vec_pretty(entries).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = self.write_private(&tmp_path, &bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            error!("Failed to replace {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!("Persisted {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }

    async fn write_private(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(())
    }

    async fn update(&self, batch: &[StoreOp]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        for op in batch {
            match op {
                StoreOp::Put { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                StoreOp::Delete { key } => {
                    entries.remove(key);
                }
            }
        }
        self.persist(&entries).await
    }
}

#[async_trait]
impl SecretStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn is_secure(&self) -> bool {
        false
    }

    async fn probe(&self) -> bool {
        match self.load().await {
            Ok(_) => true,
            Err(e) => {
                debug!("File store probe failed: {}", e);
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.load().await?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.update(&[StoreOp::put(key, value)]).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.update(&[StoreOp::delete(key)]).await
    }

    async fn apply(&self, batch: &[StoreOp]) -> Result<()> {
        self.update(batch).await
    }
}
