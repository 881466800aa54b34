pub mod error;
pub mod schema;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use snapshot::{SessionStore, SnapshotStore, SESSION_KEY, SNAPSHOT_KEY};
pub use sqlite::SqliteStore;
pub use traits::*;
