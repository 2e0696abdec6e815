use crate::{BitVector, EthSpec, SignatureBytes};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The aggregate sync-committee signature carried in every block body.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "T: EthSpec")]
pub struct SyncAggregate<T: EthSpec> {
    pub sync_committee_bits: BitVector<T::SyncCommitteeSize>,
    pub sync_committee_signature: SignatureBytes,
}

impl<T: EthSpec> SyncAggregate<T> {
    /// An empty aggregate: no participants, infinity signature.
    pub fn new() -> Self {
        Self {
            sync_committee_bits: BitVector::new(),
            sync_committee_signature: SignatureBytes::empty(),
        }
    }

    pub fn num_set_bits(&self) -> usize {
        self.sync_committee_bits.num_set_bits()
    }
}

impl<T: EthSpec> Default for SyncAggregate<T> {
    fn default() -> Self {
        Self::new()
    }
}
