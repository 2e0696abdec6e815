//! Storage functionality for the beacon chain.
//!
//! Provides the typed key/value contract the orchestrator persists through: blocks, states,
//! checkpoint marks, the head pointer, bad-block marks and the slot-indexed archive. The backing
//! engine is abstracted behind `KeyValueStore` with atomic batches; only the in-memory
//! implementation ships here, engine selection is a deployment concern.

mod errors;
mod hot_state_cache;
mod memory_store;
mod store;

pub use self::hot_state_cache::HotStateCache;
pub use self::memory_store::MemoryStore;
pub use self::store::{Store, StoreOp};
pub use errors::Error;

use ssz::{Decode, Encode};
use types::EthSpec;

/// A unique column identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DBColumn {
    /// For data related to the database itself.
    BeaconMeta,
    BeaconBlock,
    BeaconState,
    /// The justified and finalized checkpoint marks.
    BeaconCheckpoint,
    /// The canonical head pointer.
    BeaconChainHead,
    /// Roots of blocks that failed state transition; descendants are rejected without
    /// re-execution.
    BadBlock,
    /// Maps `slot -> block root` for canonical, finalized blocks.
    BeaconArchive,
    /// The persisted fork choice and its store.
    ForkChoice,
    /// The persisted operation pool.
    OpPool,
}

impl From<DBColumn> for &'static str {
    /// Returns the column name as a string, used as a key prefix.
    fn from(col: DBColumn) -> &'static str {
        match col {
            DBColumn::BeaconMeta => "bma",
            DBColumn::BeaconBlock => "blk",
            DBColumn::BeaconState => "ste",
            DBColumn::BeaconCheckpoint => "chk",
            DBColumn::BeaconChainHead => "hed",
            DBColumn::BadBlock => "bad",
            DBColumn::BeaconArchive => "arc",
            DBColumn::ForkChoice => "frk",
            DBColumn::OpPool => "opo",
        }
    }
}

impl DBColumn {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Prepend the column prefix to a key, uniquely placing it in the flat key space.
pub fn get_key_for_col(column: &str, key: &[u8]) -> Vec<u8> {
    let mut result = column.as_bytes().to_vec();
    result.extend_from_slice(key);
    result
}

/// An abstraction over a key/value database with atomic batch commits.
pub trait KeyValueStore<E: EthSpec>: Sync + Send + Sized + 'static {
    /// Retrieve some bytes in `column` with `key`.
    fn get_bytes(&self, column: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Store some `value` in `column`, indexed with `key`.
    fn put_bytes(&self, column: &str, key: &[u8], value: &[u8]) -> Result<(), Error>;

    /// Return `true` if `key` exists in `column`.
    fn key_exists(&self, column: &str, key: &[u8]) -> Result<bool, Error>;

    /// Removes `key` from `column`.
    fn key_delete(&self, column: &str, key: &[u8]) -> Result<(), Error>;

    /// Execute either all of the operations in `batch` or none at all, returning an error if any
    /// operation fails.
    fn do_atomically(&self, batch: Vec<KeyValueStoreOp>) -> Result<(), Error>;
}

/// A single operation inside an atomic batch, already keyed into the flat key space.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValueStoreOp {
    PutKeyValue(Vec<u8>, Vec<u8>),
    DeleteKey(Vec<u8>),
}

/// An item that may be stored in the database.
pub trait StoreItem: Sized {
    /// A unique column where the item may be stored.
    fn db_column() -> DBColumn;

    /// Serialize `self` as bytes.
    fn as_store_bytes(&self) -> Vec<u8>;

    /// De-serialize `self` from bytes.
    fn from_store_bytes(bytes: &[u8]) -> Result<Self, Error>;
}

/// Blanket `StoreItem` helpers for any `KeyValueStore`.
pub trait ItemStore<E: EthSpec>: KeyValueStore<E> {
    /// Store an item in `Self`.
    fn put_item<I: StoreItem>(&self, key: &[u8], item: &I) -> Result<(), Error> {
        self.put_bytes(
            I::db_column().into(),
            key,
            &item.as_store_bytes(),
        )
    }

    /// Retrieve an item from `Self`.
    fn get_item<I: StoreItem>(&self, key: &[u8]) -> Result<Option<I>, Error> {
        match self.get_bytes(I::db_column().into(), key)? {
            Some(bytes) => Ok(Some(I::from_store_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Returns `true` if the given key represents an item in `Self`.
    fn item_exists<I: StoreItem>(&self, key: &[u8]) -> Result<bool, Error> {
        self.key_exists(I::db_column().into(), key)
    }
}

impl<E: EthSpec, T: KeyValueStore<E>> ItemStore<E> for T {}

/// Implement `StoreItem` for a type that is already SSZ encode/decode.
#[macro_export]
macro_rules! impl_store_item {
    ($type: ty, $column: expr) => {
        impl $crate::StoreItem for $type {
            fn db_column() -> $crate::DBColumn {
                $column
            }

            fn as_store_bytes(&self) -> Vec<u8> {
                ssz::Encode::as_ssz_bytes(self)
            }

            fn from_store_bytes(bytes: &[u8]) -> Result<Self, $crate::Error> {
                <$type as ssz::Decode>::from_ssz_bytes(bytes).map_err(Into::into)
            }
        }
    };
}

/// The checkpoint marks persisted under the `BeaconCheckpoint` column.
#[derive(Debug, Clone, Copy, PartialEq, ssz_derive::Encode, ssz_derive::Decode)]
pub struct PersistedCheckpoints {
    pub justified: types::Checkpoint,
    pub finalized: types::Checkpoint,
}

impl StoreItem for PersistedCheckpoints {
    fn db_column() -> DBColumn {
        DBColumn::BeaconCheckpoint
    }

    fn as_store_bytes(&self) -> Vec<u8> {
        self.as_ssz_bytes()
    }

    fn from_store_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_ssz_bytes(bytes).map_err(Into::into)
    }
}
