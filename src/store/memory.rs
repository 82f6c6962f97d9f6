//! In-memory storage implementation

use super::entry::{now_millis, StoredValue};
use bytes::Bytes;
use parking_lot::Mutex;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

/// Type alias for our hash map with SipHasher
type StoreMap = HashMap<Bytes, StoredValue, BuildHasherDefault<SipHasher13>>;

/// In-memory key-value store
///
/// Shared by every connection task. A single lock guards the map; each read,
/// write and expiry deletion happens under it.
///
/// Expiry is lazy: nothing sweeps the map in the background, an expired entry
/// is removed the first time it is read.
pub struct KeyValueStore {
    store: Mutex<StoreMap>,
}

impl KeyValueStore {
    /// Create a new store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new store with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        KeyValueStore {
            store: Mutex::new(HashMap::with_capacity_and_hasher(
                capacity,
                BuildHasherDefault::<SipHasher13>::default(),
            )),
        }
    }

    /// Overwrite the value and expiry for `key`
    ///
    /// `ttl_millis` is relative to now; the absolute deadline is computed here.
    pub fn set(&self, key: impl Into<Bytes>, value: impl Into<Bytes>, ttl_millis: Option<i64>) {
        let entry = match ttl_millis {
            Some(ttl) => StoredValue::expiring(value, now_millis(), ttl),
            None => StoredValue::new(value),
        };

        self.store.lock().insert(key.into(), entry);
    }

    /// Get a value by key, returns None if not found or expired
    ///
    /// An expired entry is deleted as a side effect.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let now = now_millis();
        let mut store = self.store.lock();

        let expired = store.get(key)?.is_expired_at(now);
        if expired {
            store.remove(key);
            return None;
        }

        store.get(key).map(|entry| entry.payload.clone())
    }

    /// Delete a key, returns true if a live value was removed
    ///
    /// No command deletes keys; this is the explicit removal path for code
    /// embedding the store.
    pub fn remove(&self, key: &[u8]) -> bool {
        let now = now_millis();
        match self.store.lock().remove(key) {
            Some(entry) => !entry.is_expired_at(now),
            None => false,
        }
    }

    /// Number of entries held, including expired ones not read since
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Check if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}
