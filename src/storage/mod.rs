//! Archive artifact storage
//!
//! Archives are written straight to a local directory as `<task_id>.zip` and
//! read back through `object_store`, which lets the download endpoint stream
//! them without loading the whole file.

use object_store::local::LocalFileSystem;
use object_store::{GetResult, ObjectStore, path::Path as StoragePath};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid archive key: {0}")]
    InvalidKey(String),

    #[error("Archive not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Local archive directory, addressable by task id
#[derive(Clone)]
pub struct ArchiveStorage {
    root: PathBuf,
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ArchiveStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStorage")
            .field("root", &self.root)
            .finish()
    }
}

impl ArchiveStorage {
    /// Open (creating if needed) an archive directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        let store = LocalFileSystem::new_with_prefix(&root)?;

        tracing::info!(root = %root.display(), "Archive storage ready");

        Ok(Self {
            root,
            store: Arc::new(store),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Object key of a task's archive
    pub fn key_for(task_id: &str) -> Result<String> {
        let valid = !task_id.is_empty()
            && task_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(task_id.to_string()));
        }
        Ok(format!("{task_id}.zip"))
    }

    /// Filesystem path of a task's archive
    pub fn path_for(&self, task_id: &str) -> Result<PathBuf> {
        Ok(self.root.join(Self::key_for(task_id)?))
    }

    /// Create (or truncate) the archive file for a task
    pub async fn create(&self, task_id: &str) -> Result<BufWriter<File>> {
        let path = self.path_for(task_id)?;
        let file = tokio::fs::File::create(&path).await?.into_std().await;
        tracing::debug!(task_id, path = %path.display(), "Archive file created");
        Ok(BufWriter::new(file))
    }

    /// Open a task's archive for streaming
    pub async fn get(&self, task_id: &str) -> Result<GetResult> {
        let path = StoragePath::from(Self::key_for(task_id)?);

        match self.store.get(&path).await {
            Ok(result) => Ok(result),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StorageError::NotFound(task_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
