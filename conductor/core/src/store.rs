//! Brand State Store
//!
//! Per-brand persistence of the last known conversation. The store is a
//! plain key/value interface: `get` and `set` by brand id, with `set`
//! replacing whatever was there.
//!
//! # Implementations
//!
//! - [`MemoryStore`]: process-local, for embedding and tests
//! - [`FileStore`]: one JSON file per brand under a state directory,
//!   written through a temp file and a rename so readers never see a torn
//!   snapshot. Files are owner-only on Unix since they hold tokens.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::conversation::{now_ms, Conversation};

/// Errors from a state store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("State file error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Snapshot could not be encoded or decoded
    #[error("State serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Brand id cannot be used as a storage key
    #[error("Invalid brand id for storage: {0:?}")]
    InvalidBrand(String),
}

/// Everything remembered about one brand
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BrandState {
    /// Most recent conversation snapshot
    #[serde(default)]
    pub last_conversation: Option<Conversation>,
    /// When the snapshot was written (Unix timestamp ms)
    #[serde(default)]
    pub updated_at: Option<u64>,
}

impl BrandState {
    /// Replace the stored conversation with a snapshot of `conversation`
    pub fn record(&mut self, conversation: &Conversation) {
        self.last_conversation = Some(conversation.snapshot());
        self.updated_at = Some(now_ms());
    }
}

/// Brand-keyed persistence
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the stored state for a brand, if any
    async fn get(&self, brand_id: &str) -> Result<Option<BrandState>, StoreError>;

    /// Replace the stored state for a brand
    async fn set(&self, brand_id: &str, state: BrandState) -> Result<(), StoreError>;
}

/// Restore the last conversation persisted for `brand_id`
///
/// # Errors
///
/// Propagates store failures.
pub async fn last_conversation<S: StateStore + ?Sized>(
    store: &S,
    brand_id: &str,
) -> Result<Option<Conversation>, StoreError> {
    Ok(store
        .get(brand_id)
        .await?
        .and_then(|state| state.last_conversation)
        .map(|conversation| conversation.snapshot()))
}

/// Whether `brand_id` can be used as a storage key
///
/// Non-empty, no leading dot, and only ASCII letters, digits, `-`, `_`
/// and `.`.
#[must_use]
pub fn is_storable_brand_id(brand_id: &str) -> bool {
    !brand_id.is_empty()
        && !brand_id.starts_with('.')
        && brand_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Process-local store. Clones share contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    states: Arc<DashMap<String, BrandState>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of brands with stored state
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, brand_id: &str) -> Result<Option<BrandState>, StoreError> {
        Ok(self.states.get(brand_id).map(|s| s.value().clone()))
    }

    async fn set(&self, brand_id: &str, state: BrandState) -> Result<(), StoreError> {
        self.states.insert(brand_id.to_string(), state);
        Ok(())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// JSON file per brand under a state directory
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store files under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default state directory: `$XDG_DATA_HOME/chat-conductor/state`
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("chat-conductor").join("state"))
    }

    /// Directory holding the state files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `brand_id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidBrand`] unless [`is_storable_brand_id`]
    /// accepts the id.
    pub fn path_for(&self, brand_id: &str) -> Result<PathBuf, StoreError> {
        if !is_storable_brand_id(brand_id) {
            return Err(StoreError::InvalidBrand(brand_id.to_string()));
        }
        Ok(self.dir.join(format!("{brand_id}.json")))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&self.dir).await.map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get(&self, brand_id: &str) -> Result<Option<BrandState>, StoreError> {
        let path = self.path_for(brand_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn set(&self, brand_id: &str, state: BrandState) -> Result<(), StoreError> {
        let path = self.path_for(brand_id)?;
        let json = serde_json::to_vec_pretty(&state)?;
        self.ensure_dir().await?;

        let tmp_path = path.with_extension("json.tmp");
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp_path).await.map_err(io_err(&tmp_path))?;
        file.write_all(&json).await.map_err(io_err(&tmp_path))?;
        file.sync_all().await.map_err(io_err(&tmp_path))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(io_err(&path))?;

        tracing::debug!(brand_id, path = %path.display(), "Brand state written");
        Ok(())
    }
}
