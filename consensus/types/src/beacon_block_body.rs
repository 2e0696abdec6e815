use crate::{
    Attestation, AttesterSlashing, Deposit, Eth1Data, EthSpec, ExecutionPayload, Graffiti,
    Hash256, ProposerSlashing, SignatureBytes, SignedVoluntaryExit, SyncAggregate, VariableList,
};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The body of a `BeaconChain` block, containing operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "T: EthSpec")]
pub struct BeaconBlockBody<T: EthSpec> {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: Graffiti,
    pub proposer_slashings: VariableList<ProposerSlashing, T::MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing<T>, T::MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation<T>, T::MaxAttestations>,
    pub deposits: VariableList<Deposit, T::MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, T::MaxVoluntaryExits>,
    pub sync_aggregate: SyncAggregate<T>,
    pub execution_payload: ExecutionPayload<T>,
}

impl<T: EthSpec> BeaconBlockBody<T> {
    /// An empty body with an infinity randao reveal and default payload.
    pub fn empty() -> Self {
        Self {
            randao_reveal: SignatureBytes::empty(),
            eth1_data: Eth1Data {
                deposit_root: Hash256::zero(),
                deposit_count: 0,
                block_hash: Hash256::zero(),
            },
            graffiti: Graffiti::default(),
            proposer_slashings: VariableList::empty(),
            attester_slashings: VariableList::empty(),
            attestations: VariableList::empty(),
            deposits: VariableList::empty(),
            voluntary_exits: VariableList::empty(),
            sync_aggregate: SyncAggregate::new(),
            execution_payload: ExecutionPayload::default(),
        }
    }
}
