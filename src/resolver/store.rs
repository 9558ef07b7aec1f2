//! Persistence adapters for the entity-set mapping
//!
//! The mapping lives under one namespaced key as an array of
//! `[requested, resolved]` pairs and is rewritten in full on every save.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::io::Write;
use tokio::sync::{Mutex, RwLock};

/// Default namespace key for the mapping
pub const DEFAULT_NAMESPACE: &str = "kc:entitySetMap";

/// Durable storage for the mapping
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Read all persisted pairs
    async fn load(&self) -> Result<Vec<(String, String)>>;

    /// Replace the persisted pairs
    async fn save(&self, entries: &[(String, String)]) -> Result<()>;
}

/// Store kept in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingStore {
    entries: Arc<RwLock<Vec<(String, String)>>>,
}

impl InMemoryMappingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn load(&self) -> Result<Vec<(String, String)>> {
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, entries: &[(String, String)]) -> Result<()> {
        *self.entries.write().await = entries.to_vec();
        Ok(())
    }
}

/// Store backed by a JSON file of namespaced keys
///
/// Other keys in the file are preserved. Each write goes to its own temp
/// file next to the target and is renamed into place. Saves through one
/// store (and its clones) run one at a time.
#[derive(Debug, Clone)]
pub struct FileMappingStore {
    path: PathBuf,
    namespace: String,
    write_lock: Arc<Mutex<()>>,
}

impl FileMappingStore {
    /// Create a store at `path` using the default namespace
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_namespace(path, DEFAULT_NAMESPACE)
    }

    /// Create a store at `path` under `namespace`
    pub fn with_namespace(path: impl AsRef<Path>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            namespace: namespace.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the store file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::store(format!("Failed to read mapping file: {e}")))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::store("Mapping file is not a JSON object")),
            Err(e) => Err(Error::store(format!("Failed to parse mapping file: {e}"))),
        }
    }
}

#[async_trait]
impl MappingStore for FileMappingStore {
    async fn load(&self) -> Result<Vec<(String, String)>> {
        let document = self.read_document().await?;
        match document.get(&self.namespace) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::store(format!("Invalid mapping entries: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[(String, String)]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read_document().await?;
        document.insert(self.namespace.clone(), serde_json::to_value(entries)?);
        let contents = serde_json::to_string_pretty(&Value::Object(document))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::store(format!("Failed to create mapping dir: {e}")))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &path, contents.as_bytes()))
            .await
            .map_err(|e| Error::store(format!("Mapping write task failed: {e}")))?
    }
}

/// Write `contents` to a fresh temp file in `dir` and rename it over `path`
fn write_atomically(dir: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| Error::store(format!("Failed to create temp mapping file: {e}")))?;
    temp.write_all(contents)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| Error::store(format!("Failed to write mapping file: {e}")))?;
    temp.persist(path)
        .map_err(|e| Error::store(format!("Failed to rename mapping file: {e}")))?;
    Ok(())
}
