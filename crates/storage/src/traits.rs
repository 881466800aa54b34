use serde::{Deserialize, Serialize};

use cartsync_core::model::CartLineItem;
use cartsync_core::ops::QueuedOperation;

use crate::error::StorageError;

/// Local key-value persistence facility. Values are opaque bytes
/// (MessagePack in practice); callers own the key namespace.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<K> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Serialized form of a saved cart snapshot: the last known-good item
/// list plus when it was taken. The checksum covers the encoded items;
/// a mismatch on restore means the copy is unusable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub items: Vec<CartLineItem>,
    pub saved_at_ms: u64,
    pub checksum: [u8; 32],
}

/// Serialized form of the whole-engine session state: sync bookkeeping
/// plus any mutations still waiting to be replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub version: u64,
    pub last_synced_ms: Option<u64>,
    pub is_dirty: bool,
    pub pending: Vec<QueuedOperation>,
}
