use crate::{AggregateSignature, AttestationData, BitList, EthSpec, SignatureBytes};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Details an attestation that can be slashable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "T: EthSpec")]
pub struct Attestation<T: EthSpec> {
    pub aggregation_bits: BitList<T::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

impl<T: EthSpec> Attestation<T> {
    /// Are the aggregation bitfields of these attestations disjoint?
    pub fn signers_disjoint_from(&self, other: &Self) -> bool {
        self.aggregation_bits
            .intersection(&other.aggregation_bits)
            .is_zero()
    }

    /// Aggregate another attestation into this one.
    ///
    /// The aggregation bitfields must be disjoint, and the data must be identical.
    pub fn aggregate(&mut self, other: &Self) {
        debug_assert_eq!(self.data, other.data);
        debug_assert!(self.signers_disjoint_from(other));

        self.aggregation_bits = self.aggregation_bits.union(&other.aggregation_bits);

        let mut agg = match self.signature.decompress() {
            Ok(sig) => {
                let mut agg = AggregateSignature::infinity();
                agg.add_assign(&sig);
                agg
            }
            Err(_) => return,
        };
        if let Ok(other_sig) = other.signature.decompress() {
            agg.add_assign(&other_sig);
        }
        self.signature = SignatureBytes::from(&agg);
    }

    /// The number of set aggregation bits.
    pub fn num_set_aggregation_bits(&self) -> usize {
        self.aggregation_bits.num_set_bits()
    }
}
