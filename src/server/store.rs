//! Key/value backends for the in-process server.

use crate::error::ServerError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A value together with the index it was written at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub index: u64,
    pub value: Vec<u8>,
}

/// Per-database key/value storage. Indexes start at 0 and increase by one per
/// write within a database.
pub trait KvStore: Send + Sync {
    fn create_database(&self, name: &str) -> Result<(), ServerError>;
    fn database_exists(&self, name: &str) -> Result<bool, ServerError>;
    fn set(&self, database: &str, key: &[u8], value: &[u8]) -> Result<u64, ServerError>;
    fn get(&self, database: &str, key: &[u8]) -> Result<Option<StoredEntry>, ServerError>;
    fn flush(&self) -> Result<(), ServerError>;
}

#[derive(Default)]
struct MemoryDatabase {
    next_index: u64,
    entries: BTreeMap<Vec<u8>, StoredEntry>,
}

/// Volatile backend.
#[derive(Default)]
pub struct MemoryStore {
    databases: RwLock<HashMap<String, MemoryDatabase>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn create_database(&self, name: &str) -> Result<(), ServerError> {
        let mut databases = self.databases.write();
        if databases.contains_key(name) {
            return Err(ServerError::DatabaseExists(name.to_string()));
        }
        databases.insert(name.to_string(), MemoryDatabase::default());
        Ok(())
    }

    fn database_exists(&self, name: &str) -> Result<bool, ServerError> {
        Ok(self.databases.read().contains_key(name))
    }

    fn set(&self, database: &str, key: &[u8], value: &[u8]) -> Result<u64, ServerError> {
        let mut databases = self.databases.write();
        let db = databases
            .get_mut(database)
            .ok_or_else(|| ServerError::DatabaseNotFound(database.to_string()))?;
        let index = db.next_index;
        db.next_index += 1;
        db.entries.insert(
            key.to_vec(),
            StoredEntry {
                index,
                value: value.to_vec(),
            },
        );
        Ok(index)
    }

    fn get(&self, database: &str, key: &[u8]) -> Result<Option<StoredEntry>, ServerError> {
        let databases = self.databases.read();
        let db = databases
            .get(database)
            .ok_or_else(|| ServerError::DatabaseNotFound(database.to_string()))?;
        Ok(db.entries.get(key).cloned())
    }

    fn flush(&self) -> Result<(), ServerError> {
        Ok(())
    }
}

const META_TREE: &str = "__meta";
const DATA_TREE_PREFIX: &str = "db:";

/// Persistent backend: one sled tree per database plus a meta tree holding
/// each database's next index.
pub struct SledStore {
    db: sled::Db,
    meta: sled::Tree,
}

impl SledStore {
    pub fn open(path: &Path) -> Result<Self, ServerError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn from_db(db: sled::Db) -> Result<Self, ServerError> {
        let meta = db.open_tree(META_TREE)?;
        Ok(Self { db, meta })
    }

    fn data_tree(&self, database: &str) -> Result<sled::Tree, ServerError> {
        if !self.database_exists(database)? {
            return Err(ServerError::DatabaseNotFound(database.to_string()));
        }
        Ok(self.db.open_tree(format!("{}{}", DATA_TREE_PREFIX, database))?)
    }

    fn next_index(&self, database: &str) -> Result<u64, ServerError> {
        let previous = self.meta.fetch_and_update(database.as_bytes(), |old| {
            let current = old.map(decode_u64).unwrap_or(0);
            Some((current + 1).to_be_bytes().to_vec())
        })?;
        Ok(previous.as_deref().map(decode_u64).unwrap_or(0))
    }
}

fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[8 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    u64::from_be_bytes(buf)
}

impl KvStore for SledStore {
    fn create_database(&self, name: &str) -> Result<(), ServerError> {
        let inserted = self
            .meta
            .compare_and_swap(name.as_bytes(), None as Option<&[u8]>, Some(&0u64.to_be_bytes()[..]))?;
        if inserted.is_err() {
            return Err(ServerError::DatabaseExists(name.to_string()));
        }
        Ok(())
    }

    fn database_exists(&self, name: &str) -> Result<bool, ServerError> {
        Ok(self.meta.contains_key(name.as_bytes())?)
    }

    fn set(&self, database: &str, key: &[u8], value: &[u8]) -> Result<u64, ServerError> {
        let tree = self.data_tree(database)?;
        let index = self.next_index(database)?;
        let entry = StoredEntry {
            index,
            value: value.to_vec(),
        };
        tree.insert(key, bincode::serialize(&entry)?)?;
        Ok(index)
    }

    fn get(&self, database: &str, key: &[u8]) -> Result<Option<StoredEntry>, ServerError> {
        let tree = self.data_tree(database)?;
        match tree.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn flush(&self) -> Result<(), ServerError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn KvStore) {
        store.create_database("defaultdb").unwrap();
        assert!(store.database_exists("defaultdb").unwrap());
        assert!(!store.database_exists("other").unwrap());

        assert_eq!(store.set("defaultdb", b"a", b"1").unwrap(), 0);
        assert_eq!(store.set("defaultdb", b"b", b"2").unwrap(), 1);
        assert_eq!(store.set("defaultdb", b"a", b"3").unwrap(), 2);

        let entry = store.get("defaultdb", b"a").unwrap().unwrap();
        assert_eq!(entry, StoredEntry { index: 2, value: b"3".to_vec() });
        assert!(store.get("defaultdb", b"missing").unwrap().is_none());

        assert!(matches!(
            store.set("other", b"a", b"1"),
            Err(ServerError::DatabaseNotFound(_))
        ));
        assert!(matches!(
            store.create_database("defaultdb"),
            Err(ServerError::DatabaseExists(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sled_store() {
        let temp_dir = TempDir::new().unwrap();
        exercise(&SledStore::open(&temp_dir.path().join("store")).unwrap());
    }

    #[test]
    fn test_sled_store_persists_index_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store");
        {
            let store = SledStore::open(&path).unwrap();
            store.create_database("defaultdb").unwrap();
            store.set("defaultdb", b"a", b"1").unwrap();
            store.flush().unwrap();
        }
        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.set("defaultdb", b"b", b"2").unwrap(), 1);
        assert_eq!(store.get("defaultdb", b"a").unwrap().unwrap().value, b"1".to_vec());
    }

    #[test]
    fn test_indexes_are_per_database() {
        let store = MemoryStore::new();
        store.create_database("one").unwrap();
        store.create_database("two").unwrap();
        assert_eq!(store.set("one", b"k", b"v").unwrap(), 0);
        assert_eq!(store.set("two", b"k", b"v").unwrap(), 0);
        assert_eq!(store.set("one", b"k", b"v").unwrap(), 1);
    }
}
