//! Entity-set mapping cache
//!
//! Keys compare case-insensitively. Every mutation is written through to
//! the [`MappingStore`], one save at a time in mutation order, so the store
//! always ends up with the newest snapshot. Entries never expire; only
//! `remove` and `clear` invalidate them.

use super::store::MappingStore;
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Mapping from requested/logical names to resolved entity-set names
pub struct EntitySetCache {
    /// Lower-cased key -> (key as first requested, resolved name)
    entries: RwLock<BTreeMap<String, (String, String)>>,
    store: Arc<dyn MappingStore>,
    /// Held from snapshot to the end of the save
    persist: Mutex<()>,
}

impl EntitySetCache {
    /// Create an empty cache over `store` without reading it
    pub fn empty(store: Arc<dyn MappingStore>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            store,
            persist: Mutex::new(()),
        }
    }

    /// Create a cache seeded from whatever `store` holds
    pub async fn load(store: Arc<dyn MappingStore>) -> Result<Self> {
        let pairs = store.load().await?;
        debug!("Loaded {} entity-set mappings", pairs.len());

        let entries = pairs
            .into_iter()
            .map(|(requested, resolved)| (requested.to_lowercase(), (requested, resolved)))
            .collect();

        Ok(Self {
            entries: RwLock::new(entries),
            store,
            persist: Mutex::new(()),
        })
    }

    /// Look up a mapping
    pub async fn get(&self, name: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(&name.to_lowercase())
            .map(|(_, resolved)| resolved.clone())
    }

    /// Record a mapping and persist. Last write wins.
    pub async fn set(&self, name: &str, resolved: &str) -> Result<()> {
        let _persist = self.persist.lock().await;
        let snapshot = {
            let mut entries = self.entries.write().await;
            entries.insert(
                name.to_lowercase(),
                (name.to_string(), resolved.to_string()),
            );
            Self::pairs(&entries)
        };
        self.store.save(&snapshot).await
    }

    /// Drop one mapping and persist. Returns whether it existed.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let _persist = self.persist.lock().await;
        let (existed, snapshot) = {
            let mut entries = self.entries.write().await;
            let existed = entries.remove(&name.to_lowercase()).is_some();
            (existed, Self::pairs(&entries))
        };
        if existed {
            self.store.save(&snapshot).await?;
        }
        Ok(existed)
    }

    /// Drop every mapping and persist
    pub async fn clear(&self) -> Result<()> {
        let _persist = self.persist.lock().await;
        self.entries.write().await.clear();
        self.store.save(&[]).await
    }

    /// All mappings as `(requested, resolved)` pairs
    pub async fn entries(&self) -> Vec<(String, String)> {
        Self::pairs(&*self.entries.read().await)
    }

    /// Number of mappings
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether there are no mappings
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn pairs(entries: &BTreeMap<String, (String, String)>) -> Vec<(String, String)> {
        entries.values().cloned().collect()
    }
}

impl std::fmt::Debug for EntitySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySetCache").finish_non_exhaustive()
    }
}
