use ssz::Encode;
use ssz_derive::{Decode, Encode};
use types::{AttestationData, BeaconState, ChainSpec, Domain, Epoch, EthSpec};

/// Serialized `AttestationData` augmented by the fork-aware signing domain.
///
/// Attestations with the same data from different forks must not aggregate, so the domain bytes
/// participate in the pool key.
#[derive(PartialEq, Eq, Clone, Hash, Debug, PartialOrd, Ord, Encode, Decode)]
pub struct AttestationId {
    v: Vec<u8>,
}

impl AttestationId {
    pub fn from_data<T: EthSpec>(
        attestation: &AttestationData,
        state: &BeaconState<T>,
        spec: &ChainSpec,
    ) -> Self {
        let mut bytes = attestation.as_ssz_bytes();
        let epoch = attestation.target.epoch;
        bytes.extend_from_slice(&AttestationId::compute_domain_bytes(epoch, state, spec));
        AttestationId { v: bytes }
    }

    pub fn compute_domain_bytes<T: EthSpec>(
        epoch: Epoch,
        state: &BeaconState<T>,
        spec: &ChainSpec,
    ) -> Vec<u8> {
        spec.get_domain(
            epoch,
            Domain::BeaconAttester,
            &state.fork,
            state.genesis_validators_root,
        )
        .as_bytes()
        .to_vec()
    }

    pub fn domain_bytes_match(&self, domain_bytes: &[u8]) -> bool {
        &self.v[self.v.len() - domain_bytes.len()..] == domain_bytes
    }
}
