use crate::{EthSpec, FixedVector, PublicKeyBytes};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The rotating subset of validators that signs light-client-friendly aggregates.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "T: EthSpec")]
pub struct SyncCommittee<T: EthSpec> {
    pub pubkeys: FixedVector<PublicKeyBytes, T::SyncCommitteeSize>,
    pub aggregate_pubkey: PublicKeyBytes,
}

impl<T: EthSpec> SyncCommittee<T> {
    /// A committee where every pubkey is the placeholder key. Used before genesis derivation.
    pub fn temporary() -> Self {
        Self {
            pubkeys: FixedVector::from_elem(PublicKeyBytes::empty()),
            aggregate_pubkey: PublicKeyBytes::empty(),
        }
    }

    /// Positions of `pubkey` within the committee, if any. A validator may occupy several seats.
    pub fn positions_of(&self, pubkey: &PublicKeyBytes) -> Vec<usize> {
        self.pubkeys
            .iter()
            .enumerate()
            .filter(|(_, committee_key)| *committee_key == pubkey)
            .map(|(i, _)| i)
            .collect()
    }
}
