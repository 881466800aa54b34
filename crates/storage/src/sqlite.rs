use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;
use crate::traits::KeyValueStore;

/// SQLite-backed key-value store. One row per key; values are opaque
/// blobs. `updated_at` rides along for debugging, nothing reads it.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_roundtrip() -> Result<(), StorageError> {
        let store = SqliteStore::open_in_memory()?;
        assert_eq!(store.get("k")?, None);

        store.set("k", b"one")?;
        assert_eq!(store.get("k")?, Some(b"one".to_vec()));

        store.set("k", b"two")?;
        assert_eq!(store.get("k")?, Some(b"two".to_vec()));

        store.remove("k")?;
        assert_eq!(store.get("k")?, None);
        Ok(())
    }

    #[test]
    fn values_survive_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("kv.db");
        let path = path.to_str().ok_or("non-utf8 temp path")?;

        {
            let store = SqliteStore::open(path)?;
            store.set("cart", b"payload")?;
        }
        let store = SqliteStore::open(path)?;
        assert_eq!(store.get("cart")?, Some(b"payload".to_vec()));
        Ok(())
    }
}
