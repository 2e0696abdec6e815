use crate::PublicKeyBytes;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps a validator public key to its registry index.
///
/// Grows append-only alongside the validator registry; the registry never shrinks or reorders.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct PubkeyCache {
    /// Maintain the number of keys added to the map. It is not sufficient to just use the size of
    /// the map, as it will not include duplicate keys.
    len: usize,
    map: HashMap<PublicKeyBytes, usize>,
}

impl PubkeyCache {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a validator index into the map.
    ///
    /// The added index must equal the number of validators already added to the map. This ensures
    /// that an index is never skipped.
    pub fn insert(&mut self, pubkey: PublicKeyBytes, index: usize) -> bool {
        if index == self.len {
            self.map.insert(pubkey, index);
            self.len += 1;
            true
        } else {
            false
        }
    }

    /// Looks up a validator index by its public key.
    pub fn get(&self, pubkey: &PublicKeyBytes) -> Option<usize> {
        self.map.get(pubkey).copied()
    }
}
