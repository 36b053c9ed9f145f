//! In-memory image document store with copy-on-save and copy-on-load

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::key::CacheKey;
use crate::errors::{CacheError, CacheResult};
use crate::svg::XmlDocument;

/// Process-lifetime store of decoded vector-image documents
///
/// Cloning the cache is cheap and yields a handle to the same store, so one
/// instance is constructed by the composition root and injected into every
/// consumer. Entries are never evicted.
#[derive(Clone, Default)]
pub struct ImageCache {
    documents: Arc<RwLock<HashMap<CacheKey, XmlDocument>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure membership test
    pub async fn has(&self, key: &CacheKey) -> bool {
        self.documents.read().await.contains_key(key)
    }

    /// Store a copy of `document` under `key`
    ///
    /// Only vector-image documents are accepted; anything else is rejected
    /// with [`CacheError::InvalidDocument`] and the cache is left unchanged.
    /// On success the caller receives another copy, independent of both its
    /// input and the stored entry.
    pub async fn save(&self, key: &CacheKey, document: &XmlDocument) -> CacheResult<XmlDocument> {
        if !document.is_svg() {
            warn!(
                "Rejected non-image document for cache key {} (root <{}>)",
                key,
                document.root().name
            );
            return Err(CacheError::invalid_document(
                key.as_str(),
                document.root().name.as_str(),
            ));
        }

        let stored = document.clone();
        let returned = stored.clone();
        self.documents.write().await.insert(key.clone(), stored);
        debug!("Cached image document: {}", key);
        Ok(returned)
    }

    /// Load a copy of the document stored under `key`
    pub async fn load(&self, key: &CacheKey) -> CacheResult<XmlDocument> {
        self.documents
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::key_not_found(key.as_str()))
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// All keys, sorted
    pub async fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<_> = self.documents.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
