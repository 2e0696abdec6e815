//! A testing harness which produces fully-signed blocks and attestations and drives them through
//! a `BeaconChain` exactly like a network feeder would.

use crate::beacon_chain::{BeaconChain, ChainConfig, ReceiveOutcome};
use crate::execution_engine::MockExecutionEngine;
use crate::BlockError;
use bls::{AggregateSignature, Keypair};
use ethereum_hashing::hash;
use slog::Logger;
use ssz::Encode;
use state_processing::{
    complete_state_advance, per_block_processing, BlockSignatureStrategy, ConsensusContext,
};
use std::collections::HashMap;
use std::sync::Arc;
use store::{MemoryStore, Store};
use tree_hash::TreeHash;
use types::{
    Attestation, BeaconBlock, BeaconState, BitList, BitVector, ChainSpec, Checkpoint, Domain,
    Epoch, Eth1Data, EthSpec, ExecutionBlockHash, ExecutionPayload, Hash256, PublicKeyBytes,
    RelativeEpoch, SignatureBytes, SignedBeaconBlock, SignedRoot, SigningData, Slot,
    SyncAggregate, Validator,
};

/// Deterministic keypairs, the same for every test run.
pub fn generate_deterministic_keypairs(validator_count: usize) -> Vec<Keypair> {
    (0..validator_count as u64)
        .map(Keypair::deterministic)
        .collect()
}

/// Build a genesis state with the given keypairs as active validators at full effective balance.
pub fn interop_genesis_state<E: EthSpec>(
    keypairs: &[Keypair],
    genesis_time: u64,
    spec: &ChainSpec,
) -> BeaconState<E> {
    let eth1_data = Eth1Data {
        deposit_root: Hash256::from_slice(&hash(b"eth1 deposit root")),
        deposit_count: keypairs.len() as u64,
        block_hash: Hash256::from_slice(&hash(b"eth1 block hash")),
    };

    let mut state = BeaconState::new(genesis_time, eth1_data, spec);
    state.genesis_validators_root = Hash256::from_slice(&hash(b"genesis validators root"));
    state.eth1_deposit_index = keypairs.len() as u64;

    // Seed the randao accumulator with the eth1 block hash, as interop genesis does.
    for i in 0..E::epochs_per_historical_vector() {
        state.randao_mixes[i] = state.eth1_data.block_hash;
    }

    for (i, keypair) in keypairs.iter().enumerate() {
        state
            .validators
            .push(Validator {
                pubkey: keypair.pk.compress(),
                withdrawal_credentials: Hash256::from_low_u64_be(i as u64),
                effective_balance: spec.max_effective_balance,
                slashed: false,
                activation_eligibility_epoch: Epoch::new(0),
                activation_epoch: Epoch::new(0),
                exit_epoch: spec.far_future_epoch,
                withdrawable_epoch: spec.far_future_epoch,
            })
            .expect("registry limit is far above test sizes");
        state
            .balances
            .push(spec.max_effective_balance)
            .expect("balance limit is far above test sizes");
        state
            .previous_epoch_participation
            .push(Default::default())
            .expect("participation limit is far above test sizes");
        state
            .current_epoch_participation
            .push(Default::default())
            .expect("participation limit is far above test sizes");
        state
            .inactivity_scores
            .push(0)
            .expect("inactivity limit is far above test sizes");
    }

    let sync_committee = Arc::new(
        state
            .get_next_sync_committee(spec)
            .expect("sync committee derives from a non-empty registry"),
    );
    state.current_sync_committee = sync_committee.clone();
    state.next_sync_committee = sync_committee;

    state
}

pub fn test_logger() -> Logger {
    use sloggers::null::NullLoggerBuilder;
    use sloggers::Build;
    NullLoggerBuilder.build().expect("null logger builds")
}

/// A testing harness which wraps a `BeaconChain` and can produce valid signed blocks and
/// attestations for it.
pub struct BeaconChainHarness<E: EthSpec> {
    pub chain: BeaconChain<E, MemoryStore<E>>,
    pub keypairs: Vec<Keypair>,
    pub mock_engine: Arc<MockExecutionEngine>,
    pub spec: ChainSpec,
    pubkey_to_index: HashMap<PublicKeyBytes, usize>,
}

impl<E: EthSpec> BeaconChainHarness<E> {
    pub fn new(validator_count: usize) -> Self {
        Self::new_with_config(validator_count, ChainConfig::default())
    }

    pub fn new_with_config(validator_count: usize, config: ChainConfig) -> Self {
        let spec = E::default_spec();
        let keypairs = generate_deterministic_keypairs(validator_count);
        let genesis_state = interop_genesis_state::<E>(&keypairs, 0, &spec);

        let store = Arc::new(Store::new(MemoryStore::open(), spec.clone()));
        let mock_engine = Arc::new(MockExecutionEngine::new());

        let chain = BeaconChain::from_genesis(
            store,
            mock_engine.clone(),
            genesis_state,
            config,
            test_logger(),
        )
        .expect("genesis chain initializes");

        let pubkey_to_index = keypairs
            .iter()
            .enumerate()
            .map(|(i, keypair)| (keypair.pk.compress(), i))
            .collect();

        Self {
            chain,
            keypairs,
            mock_engine,
            spec,
            pubkey_to_index,
        }
    }

    pub fn genesis_block_root(&self) -> Hash256 {
        self.chain.genesis_block_root()
    }

    /// Produce a fully-signed block atop the current head, packing pooled operations.
    pub fn make_block(&self, slot: Slot) -> SignedBeaconBlock<E> {
        self.make_block_with_modifier(slot, |_| {})
    }

    /// Sign a block message with its stated proposer's key.
    pub fn sign_block(&self, block: BeaconBlock<E>) -> SignedBeaconBlock<E> {
        let head = self.chain.head_snapshot();
        let proposer_sk = &self.keypairs[block.proposer_index as usize].sk;
        block.sign(
            proposer_sk,
            &head.beacon_state.fork,
            head.beacon_state.genesis_validators_root,
            &self.spec,
        )
    }

    /// Produce a fully-signed block atop the current head, applying `modifier` to the unsigned
    /// block before the state root is computed.
    pub fn make_block_with_modifier(
        &self,
        slot: Slot,
        modifier: impl FnOnce(&mut BeaconBlock<E>),
    ) -> SignedBeaconBlock<E> {
        let head = self.chain.head_snapshot();
        let mut state = (*head.beacon_state).clone();
        let known_root = head.beacon_state_root();
        complete_state_advance(&mut state, Some(known_root), slot, &self.spec)
            .expect("state advances to proposal slot");
        state
            .build_committee_cache(RelativeEpoch::Previous, &self.spec)
            .expect("committee cache builds");
        state
            .build_committee_cache(RelativeEpoch::Current, &self.spec)
            .expect("committee cache builds");

        let proposer_index = state
            .get_beacon_proposer_index(slot, &self.spec)
            .expect("proposer index resolves");
        let proposer_sk = &self.keypairs[proposer_index].sk;

        // Randao reveal: the proposer signs the epoch.
        let epoch = slot.epoch(E::slots_per_epoch());
        let randao_domain = self.spec.get_domain(
            epoch,
            Domain::Randao,
            &state.fork,
            state.genesis_validators_root,
        );
        let randao_reveal = SignatureBytes::from(
            &proposer_sk.sign(epoch.signing_root(randao_domain)),
        );

        let attestations = self.chain.op_pool.get_attestations(&state, &self.spec);
        let deposits = self.chain.op_pool.get_deposits(&state);
        let voluntary_exits = self.chain.op_pool.get_voluntary_exits(&state, &self.spec);
        let (proposer_slashings, attester_slashings) =
            self.chain.op_pool.get_slashings(&state, &self.spec);

        let sync_aggregate = self.make_sync_aggregate(&state, head.beacon_block_root, slot);
        let execution_payload = self.make_execution_payload(&state, &randao_reveal, slot);

        let mut block = BeaconBlock {
            slot,
            proposer_index: proposer_index as u64,
            parent_root: head.beacon_block_root,
            state_root: Hash256::zero(),
            body: types::BeaconBlockBody {
                randao_reveal,
                eth1_data: state.eth1_data.clone(),
                graffiti: Default::default(),
                proposer_slashings: list(proposer_slashings),
                attester_slashings: list(attester_slashings),
                attestations: list(attestations),
                deposits: list(deposits),
                voluntary_exits: list(voluntary_exits),
                sync_aggregate,
                execution_payload,
            },
        };

        modifier(&mut block);

        // Compute the post-state root by applying the block to a copy of the state.
        let mut post_state = state;
        let mut ctxt =
            ConsensusContext::new(slot).set_proposer_index(proposer_index as u64);
        per_block_processing(
            &mut post_state,
            &SignedBeaconBlock {
                message: block.clone(),
                signature: SignatureBytes::empty(),
            },
            BlockSignatureStrategy::NoVerification,
            &mut ctxt,
            &self.spec,
        )
        .expect("self-produced block applies cleanly");
        block.state_root = post_state.canonical_root();

        block.sign(
            proposer_sk,
            &post_state.fork,
            post_state.genesis_validators_root,
            &self.spec,
        )
    }

    fn make_sync_aggregate(
        &self,
        state: &BeaconState<E>,
        parent_root: Hash256,
        slot: Slot,
    ) -> SyncAggregate<E> {
        let previous_slot = slot.saturating_sub(1u64);
        let domain = self.spec.get_domain(
            previous_slot.epoch(E::slots_per_epoch()),
            Domain::SyncCommittee,
            &state.fork,
            state.genesis_validators_root,
        );
        let message = SigningData {
            object_root: parent_root,
            domain,
        }
        .tree_hash_root();

        let mut bits = BitVector::new();
        let mut signature = AggregateSignature::infinity();
        for (i, pubkey) in state.current_sync_committee.pubkeys.iter().enumerate() {
            let validator_index = self.pubkey_to_index[pubkey];
            bits.set(i, true).expect("bit index within committee size");
            signature.add_assign(&self.keypairs[validator_index].sk.sign(message));
        }

        SyncAggregate {
            sync_committee_bits: bits,
            sync_committee_signature: SignatureBytes::from(&signature),
        }
    }

    fn make_execution_payload(
        &self,
        state: &BeaconState<E>,
        randao_reveal: &SignatureBytes,
        slot: Slot,
    ) -> ExecutionPayload<E> {
        let header = &state.latest_execution_payload_header;

        // The payload is checked against the *post-randao* accumulator.
        let pre_mix = *state
            .get_randao_mix(state.current_epoch())
            .expect("current mix exists");
        let reveal_hash = hash(&randao_reveal.as_ssz_bytes());
        let mut prev_randao = [0u8; 32];
        for (i, byte) in prev_randao.iter_mut().enumerate() {
            *byte = pre_mix.as_bytes()[i] ^ reveal_hash[i];
        }

        let mut block_hash_preimage = header.block_hash.into_root().as_bytes().to_vec();
        block_hash_preimage.extend_from_slice(&slot.as_u64().to_le_bytes());

        ExecutionPayload {
            parent_hash: header.block_hash,
            fee_recipient: Default::default(),
            state_root: Hash256::from_low_u64_be(slot.as_u64()),
            receipts_root: Hash256::zero(),
            logs_bloom: Default::default(),
            prev_randao: Hash256::from_slice(&prev_randao),
            block_number: header.block_number + 1,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: state.genesis_time + slot.as_u64() * self.spec.seconds_per_slot,
            extra_data: Default::default(),
            base_fee_per_gas: Default::default(),
            block_hash: ExecutionBlockHash::from_root(Hash256::from_slice(&hash(
                &block_hash_preimage,
            ))),
            transactions: Default::default(),
        }
    }

    /// Create one fully-aggregated attestation per committee of `slot`, voting for `head_root`.
    ///
    /// `state` must be the post-state of the block at `head_root`, advanced to `slot`.
    pub fn make_attestations(
        &self,
        state: &BeaconState<E>,
        head_root: Hash256,
        slot: Slot,
    ) -> Vec<Attestation<E>> {
        let epoch = slot.epoch(E::slots_per_epoch());
        let target_slot = epoch.start_slot(E::slots_per_epoch());
        let target_root = if state.slot <= target_slot {
            head_root
        } else {
            *state
                .get_block_root(target_slot)
                .expect("target root within historical window")
        };

        let data_template = types::AttestationData {
            slot,
            index: 0,
            beacon_block_root: head_root,
            source: state.current_justified_checkpoint,
            target: Checkpoint {
                epoch,
                root: target_root,
            },
        };

        let committee_count = state
            .get_committee_count_at_slot(slot)
            .expect("committee count resolves");

        let mut attestations = vec![];
        for index in 0..committee_count {
            let committee = state
                .get_beacon_committee(slot, index)
                .expect("committee resolves");

            let mut data = data_template.clone();
            data.index = index;

            let domain = self.spec.get_domain(
                data.target.epoch,
                Domain::BeaconAttester,
                &state.fork,
                state.genesis_validators_root,
            );
            let message = data.signing_root(domain);

            let mut bits = BitList::with_capacity(committee.committee.len())
                .expect("committee fits in bitlist");
            let mut signature = AggregateSignature::infinity();
            for (position, &validator_index) in committee.committee.iter().enumerate() {
                bits.set(position, true).expect("position is in range");
                signature.add_assign(&self.keypairs[validator_index].sk.sign(message));
            }

            attestations.push(Attestation {
                aggregation_bits: bits,
                data,
                signature: SignatureBytes::from(&signature),
            });
        }

        attestations
    }

    /// Advance the wall clock and head to `slot`, producing a block and attesting to it with
    /// every validator.
    pub fn advance_slot_with_block(&self, slot: Slot) -> Hash256 {
        self.chain.on_slot(slot).expect("on_slot succeeds");

        let block = self.make_block(slot);
        let block_root = block.canonical_root();
        match self.chain.receive_block(block) {
            ReceiveOutcome::Accepted => {}
            other => panic!("self-produced block not accepted: {:?}", other),
        }

        // Attest to the new head and feed the attestations back through the gossip path.
        let head = self.chain.head_snapshot();
        let attestations = self.make_attestations(&head.beacon_state, block_root, slot);
        for attestation in attestations {
            let outcome = self.chain.receive_attestation(attestation);
            assert!(
                outcome.is_accepted(),
                "self-produced attestation not accepted: {:?}",
                outcome
            );
        }

        block_root
    }

    /// Extend the canonical chain by one block per slot up to and including `end_slot`.
    pub fn extend_to_slot(&self, end_slot: Slot) -> Hash256 {
        let mut head_root = self.chain.head_root();
        let mut slot = self.chain.current_slot() + 1u64;
        while slot <= end_slot {
            head_root = self.advance_slot_with_block(slot);
            slot += Slot::new(1);
        }
        head_root
    }

    /// Process a block produced elsewhere (e.g. a fork block).
    pub fn process_block(&self, block: SignedBeaconBlock<E>) -> ReceiveOutcome<BlockError> {
        self.chain.receive_block(block)
    }
}

/// Convert a `Vec` into an SSZ `VariableList`, panicking if the list is over-long. Test use
/// only; the operation pool already respects the block limits.
fn list<T, N: types::typenum::Unsigned>(vec: Vec<T>) -> types::VariableList<T, N> {
    types::VariableList::new(vec).expect("list length within bounds")
}
