use std::sync::{Arc, PoisonError, RwLock};

use stateboard_core::ObjectKey;

/// The key list seen by the most recent successful listing.
///
/// Readers get an immutable `Arc<[ObjectKey]>`; a refresh swaps in a new
/// one. The lock is only held for the pointer clone or swap.
#[derive(Debug)]
pub struct KeySnapshot {
    inner: RwLock<Arc<[ObjectKey]>>,
}

impl Default for KeySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySnapshot {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub fn load(&self) -> Arc<[ObjectKey]> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, keys: Vec<ObjectKey>) -> Arc<[ObjectKey]> {
        let next: Arc<[ObjectKey]> = Arc::from(keys);
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = next.clone();
        next
    }
}
