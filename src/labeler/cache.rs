use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::VlmBackend;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendKey {
    pub model_id: String,
    pub device: String,
}

impl BackendKey {
    pub fn new(model_id: &str, device: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            device: device.to_string(),
        }
    }
}

/// Owned cache of vision-model backends keyed by `(model_id, device)`.
///
/// Entries are never evicted; the number of distinct pairs in a run is small.
#[derive(Default)]
pub struct BackendCache {
    backends: HashMap<BackendKey, Arc<dyn VlmBackend>>,
}

impl std::fmt::Debug for BackendCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCache")
            .field("keys", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BackendCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn contains(&self, key: &BackendKey) -> bool {
        self.backends.contains_key(key)
    }

    pub fn get(&self, key: &BackendKey) -> Option<Arc<dyn VlmBackend>> {
        self.backends.get(key).cloned()
    }

    /// Returns the cached backend for `key`, creating it with `init` on a miss.
    /// A failed `init` leaves the cache unchanged.
    pub fn get_or_try_insert_with<F>(&mut self, key: BackendKey, init: F) -> Result<Arc<dyn VlmBackend>>
    where
        F: FnOnce() -> Result<Arc<dyn VlmBackend>>,
    {
        if let Some(backend) = self.backends.get(&key) {
            return Ok(Arc::clone(backend));
        }
        let backend = init()?;
        log::debug!("Cached backend {}@{}", key.model_id, key.device);
        self.backends.insert(key, Arc::clone(&backend));
        Ok(backend)
    }
}
