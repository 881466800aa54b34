use cartsync_core::clock::now_ms;
use cartsync_core::model::CartLineItem;

use crate::error::StorageError;
use crate::traits::{KeyValueStore, SessionRecord, SnapshotRecord};

/// Fixed key the snapshot store writes under.
pub const SNAPSHOT_KEY: &str = "cartsync.snapshot";

/// Fixed key the session store writes under.
pub const SESSION_KEY: &str = "cartsync.session";

fn items_checksum(items: &[CartLineItem]) -> Result<[u8; 32], StorageError> {
    let bytes =
        rmp_serde::to_vec(items).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(*blake3::hash(&bytes).as_bytes())
}

/// Durable copy of the last known-good item list, used only for recovery
/// when the server cannot be reached on load. Never authoritative; never
/// consulted during normal mutations.
pub struct SnapshotStore<K> {
    store: K,
}

impl<K: KeyValueStore> SnapshotStore<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn save(&self, items: &[CartLineItem]) -> Result<(), StorageError> {
        let record = SnapshotRecord {
            items: items.to_vec(),
            saved_at_ms: now_ms()?,
            checksum: items_checksum(items)?,
        };
        let bytes =
            rmp_serde::to_vec(&record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(SNAPSHOT_KEY, &bytes)
    }

    /// Last saved copy, or `None` if nothing was saved or the stored bytes
    /// fail to decode or checksum. A broken snapshot restores as absent.
    pub fn restore(&self) -> Result<Option<SnapshotRecord>, StorageError> {
        let Some(bytes) = self.store.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        let record: SnapshotRecord = match rmp_serde::from_slice(&bytes) {
            Ok(record) => record,
            Err(_) => return Ok(None),
        };
        if items_checksum(&record.items)? != record.checksum {
            return Ok(None);
        }
        Ok(Some(record))
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(SNAPSHOT_KEY)
    }
}

/// Whole-engine state under its own key: version counter, sync timestamp,
/// dirty flag, and the pending offline queue — enough to resume after a
/// process restart without losing queued mutations.
pub struct SessionStore<K> {
    store: K,
}

impl<K: KeyValueStore> SessionStore<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn save(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let bytes =
            rmp_serde::to_vec(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(SESSION_KEY, &bytes)
    }

    pub fn load(&self) -> Result<Option<SessionRecord>, StorageError> {
        let Some(bytes) = self.store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        // Undecodable session state is treated as absent: the engine starts
        // fresh rather than failing startup.
        Ok(rmp_serde::from_slice(&bytes).ok())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(SESSION_KEY)
    }
}
