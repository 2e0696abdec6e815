use crate::{get_key_for_col, Error, KeyValueStore, KeyValueStoreOp};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use types::EthSpec;

/// A thread-safe `BTreeMap` wrapper providing the `KeyValueStore` contract.
///
/// Only intended for testing and ephemeral deployments; everything is lost on drop.
#[derive(Debug)]
pub struct MemoryStore<E: EthSpec> {
    db: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> MemoryStore<E> {
    /// Create a new, empty database.
    pub fn open() -> Self {
        Self {
            db: RwLock::new(BTreeMap::new()),
            _phantom: PhantomData,
        }
    }
}

impl<E: EthSpec> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::open()
    }
}

impl<E: EthSpec> KeyValueStore<E> for MemoryStore<E> {
    fn get_bytes(&self, column: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let column_key = get_key_for_col(column, key);
        Ok(self.db.read().get(&column_key).cloned())
    }

    fn put_bytes(&self, column: &str, key: &[u8], value: &[u8]) -> Result<(), Error> {
        let column_key = get_key_for_col(column, key);
        self.db.write().insert(column_key, value.to_vec());
        Ok(())
    }

    fn key_exists(&self, column: &str, key: &[u8]) -> Result<bool, Error> {
        let column_key = get_key_for_col(column, key);
        Ok(self.db.read().contains_key(&column_key))
    }

    fn key_delete(&self, column: &str, key: &[u8]) -> Result<(), Error> {
        let column_key = get_key_for_col(column, key);
        self.db.write().remove(&column_key);
        Ok(())
    }

    fn do_atomically(&self, batch: Vec<KeyValueStoreOp>) -> Result<(), Error> {
        // A single write lock over the whole batch makes it atomic with respect to readers.
        let mut db = self.db.write();
        for op in batch {
            match op {
                KeyValueStoreOp::PutKeyValue(key, value) => {
                    db.insert(key, value);
                }
                KeyValueStoreOp::DeleteKey(key) => {
                    db.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::MainnetEthSpec;

    type E = MainnetEthSpec;

    #[test]
    fn get_put_delete() {
        let store = MemoryStore::<E>::open();

        store.put_bytes("col", b"key", b"value").unwrap();
        assert_eq!(
            store.get_bytes("col", b"key").unwrap(),
            Some(b"value".to_vec())
        );
        assert!(store.key_exists("col", b"key").unwrap());

        // Same key in a different column is distinct.
        assert!(!store.key_exists("loc", b"key").unwrap());

        store.key_delete("col", b"key").unwrap();
        assert!(!store.key_exists("col", b"key").unwrap());
    }

    #[test]
    fn batch_is_applied_wholly() {
        let store = MemoryStore::<E>::open();
        store.put_bytes("col", b"a", b"1").unwrap();

        let batch = vec![
            KeyValueStoreOp::PutKeyValue(get_key_for_col("col", b"b"), b"2".to_vec()),
            KeyValueStoreOp::DeleteKey(get_key_for_col("col", b"a")),
        ];
        store.do_atomically(batch).unwrap();

        assert!(!store.key_exists("col", b"a").unwrap());
        assert_eq!(store.get_bytes("col", b"b").unwrap(), Some(b"2".to_vec()));
    }
}
