use crate::ConsensusContext;
use errors::{BlockOperationError, BlockProcessingError, ExecutionPayloadInvalid, HeaderInvalid};
use ethereum_hashing::hash;
use safe_arith::SafeArith;
use ssz::Encode;
use types::{
    BeaconBlock, BeaconState, ChainSpec, Domain, Eth1Data, EthSpec, ExecutionPayload,
    ExecutionPayloadHeader, Hash256, RelativeEpoch, SignedBeaconBlock, SignedRoot,
};

pub mod errors;
mod is_valid_indexed_attestation;
pub mod process_operations;
mod process_sync_aggregate;
mod verify_attestation;
mod verify_attester_slashing;
mod verify_deposit;
mod verify_exit;
mod verify_proposer_slashing;

pub use is_valid_indexed_attestation::is_valid_indexed_attestation;
pub use process_operations::{process_deposit, process_operations};
pub use process_sync_aggregate::process_sync_aggregate;
pub use verify_attestation::verify_attestation_for_block_inclusion;
pub use verify_attester_slashing::{
    get_slashable_indices, get_slashable_indices_modular, verify_attester_slashing,
};
pub use verify_deposit::{
    deposit_tree_root_and_proofs, verify_deposit_merkle_proof, verify_deposit_signature,
};
pub use verify_exit::{verify_exit, verify_exit_time_independent_only};
pub use verify_proposer_slashing::verify_proposer_slashing;

/// The strategy to be used when validating the block's signatures.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum BlockSignatureStrategy {
    /// Do not validate any signature. Use with caution.
    NoVerification,
    /// Validate each signature individually, as its object is processed.
    VerifyIndividual,
}

/// The strategy to be used when validating the block's signatures.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum VerifySignatures {
    /// Validate all signatures encountered.
    True,
    /// Do not validate any signature. Use with caution.
    False,
}

impl VerifySignatures {
    pub fn is_true(self) -> bool {
        self == VerifySignatures::True
    }
}

/// Updates the state for a new block, whilst validating that the block is valid, optionally
/// checking the block proposer signature.
///
/// Returns `Ok(())` if the block is valid and the state was successfully updated. Otherwise
/// returns an error describing why the block was invalid or how the function failed to execute.
pub fn per_block_processing<T: EthSpec>(
    state: &mut BeaconState<T>,
    signed_block: &SignedBeaconBlock<T>,
    block_signature_strategy: BlockSignatureStrategy,
    ctxt: &mut ConsensusContext<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let block = &signed_block.message;

    // Build the caches that nearly every sub-transition consults.
    state.build_committee_cache(RelativeEpoch::Previous, spec)?;
    state.build_committee_cache(RelativeEpoch::Current, spec)?;
    state.build_total_active_balance_cache(spec)?;
    state.update_pubkey_cache()?;

    let verify_signatures = match block_signature_strategy {
        BlockSignatureStrategy::VerifyIndividual => VerifySignatures::True,
        BlockSignatureStrategy::NoVerification => VerifySignatures::False,
    };

    process_block_header(state, block, ctxt, spec)?;

    if verify_signatures.is_true() {
        verify_block_signature(state, signed_block, spec)?;
    }

    process_randao(state, block, verify_signatures, ctxt, spec)?;
    process_eth1_data(state, &block.body.eth1_data)?;
    process_operations(state, &block.body, verify_signatures, ctxt, spec)?;

    let proposer_index = ctxt.get_proposer_index(state, spec)?;
    process_sync_aggregate(
        state,
        &block.body.sync_aggregate,
        proposer_index,
        verify_signatures,
        spec,
    )?;

    process_execution_payload(state, &block.body.execution_payload, spec)?;

    Ok(())
}

/// Processes the block header, returning the proposer index.
pub fn process_block_header<T: EthSpec>(
    state: &mut BeaconState<T>,
    block: &BeaconBlock<T>,
    ctxt: &mut ConsensusContext<T>,
    spec: &ChainSpec,
) -> Result<u64, BlockOperationError<HeaderInvalid>> {
    // Verify that the slots match.
    verify!(
        block.slot == state.slot,
        HeaderInvalid::StateSlotMismatch {
            block_slot: block.slot,
            state_slot: state.slot,
        }
    );

    // Verify that the block is newer than the latest block header.
    verify!(
        block.slot > state.latest_block_header.slot,
        HeaderInvalid::OlderThanLatestBlockHeader {
            block_slot: block.slot,
            latest_block_header_slot: state.latest_block_header.slot,
        }
    );

    // Verify that proposer index is the correct index.
    let proposer_index = block.proposer_index;
    let state_proposer_index = ctxt
        .get_proposer_index(state, spec)
        .map_err(|_| BlockOperationError::BeaconStateError(types::BeaconStateError::UnableToDetermineProducer))?;
    verify!(
        proposer_index == state_proposer_index,
        HeaderInvalid::ProposerIndexMismatch {
            block_proposer_index: proposer_index,
            state_proposer_index,
        }
    );

    let expected_previous_block_root = state.latest_block_header.canonical_root();
    verify!(
        block.parent_root == expected_previous_block_root,
        HeaderInvalid::ParentBlockRootMismatch {
            state: expected_previous_block_root,
            block: block.parent_root,
        }
    );

    state.latest_block_header = block.temporary_block_header();

    // Verify proposer is not slashed.
    verify!(
        !state.get_validator(proposer_index as usize)?.slashed,
        HeaderInvalid::ProposerSlashed(proposer_index)
    );

    Ok(proposer_index)
}

/// Verifies the signature of a block.
pub fn verify_block_signature<T: EthSpec>(
    state: &BeaconState<T>,
    signed_block: &SignedBeaconBlock<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let block = &signed_block.message;
    let proposer = state.get_validator(block.proposer_index as usize)?;

    let domain = spec.get_domain(
        block.epoch(),
        Domain::BeaconProposer,
        &state.fork,
        state.genesis_validators_root,
    );
    let message = block.signing_root(domain);

    let valid = proposer
        .pubkey
        .decompress()
        .ok()
        .zip(signed_block.signature.decompress().ok())
        .map_or(false, |(pubkey, signature)| {
            signature.verify(&pubkey, message)
        });

    block_verify!(valid, BlockProcessingError::ProposalSignatureInvalid);

    Ok(())
}

/// Verifies the `randao_reveal` against the block's proposer pubkey and updates
/// `state.latest_randao_mixes`.
pub fn process_randao<T: EthSpec>(
    state: &mut BeaconState<T>,
    block: &BeaconBlock<T>,
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    if verify_signatures.is_true() {
        let proposer_index = ctxt.get_proposer_index(state, spec)?;
        let proposer = state.get_validator(proposer_index as usize)?;

        let domain = spec.get_domain(
            block.epoch(),
            Domain::Randao,
            &state.fork,
            state.genesis_validators_root,
        );
        let message = block.epoch().signing_root(domain);

        let valid = proposer
            .pubkey
            .decompress()
            .ok()
            .zip(block.body.randao_reveal.decompress().ok())
            .map_or(false, |(pubkey, signature)| {
                signature.verify(&pubkey, message)
            });

        block_verify!(valid, BlockProcessingError::RandaoSignatureInvalid);
    }

    // Update the current epoch's randao mix with the reveal.
    let reveal_hash = Hash256::from_slice(&hash(&block.body.randao_reveal.as_ssz_bytes()));
    state.update_randao_mix(state.current_epoch(), reveal_hash)?;

    Ok(())
}

/// Update the `eth1_data_votes`, adopting a new `eth1_data` once a majority of the voting window
/// supports it.
pub fn process_eth1_data<T: EthSpec>(
    state: &mut BeaconState<T>,
    eth1_data: &Eth1Data,
) -> Result<(), BlockProcessingError> {
    if let Some(new_eth1_data) = get_new_eth1_data(state, eth1_data)? {
        state.eth1_data = new_eth1_data;
    }

    state.eth1_data_votes.push(eth1_data.clone())?;

    Ok(())
}

/// Returns `Ok(Some(eth1_data))` if adding the given `eth1_data` to `state.eth1_data_votes` would
/// result in a change to `state.eth1_data`.
pub fn get_new_eth1_data<T: EthSpec>(
    state: &BeaconState<T>,
    eth1_data: &Eth1Data,
) -> Result<Option<Eth1Data>, BlockProcessingError> {
    let num_votes = state
        .eth1_data_votes
        .iter()
        .filter(|vote| *vote == eth1_data)
        .count();

    // The +1 is to account for the `eth1_data` supplied to the function.
    if num_votes.safe_add(1)?.safe_mul(2)? > T::slots_per_eth1_voting_period() {
        Ok(Some(eth1_data.clone()))
    } else {
        Ok(None)
    }
}

/// Verify the execution payload's consistency against the header in state and adopt its header.
///
/// Execution-level validity (transactions, state root) is the execution engine's concern and is
/// checked by the caller through its engine handle, not here.
pub fn process_execution_payload<T: EthSpec>(
    state: &mut BeaconState<T>,
    payload: &ExecutionPayload<T>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Parent-hash chaining. The genesis placeholder header is all-zero and accepts anything
    // whose parent is also all-zero.
    block_verify!(
        payload.parent_hash == state.latest_execution_payload_header.block_hash,
        BlockOperationError::invalid(ExecutionPayloadInvalid::ParentHashMismatch {
            state: state.latest_execution_payload_header.block_hash,
            payload: payload.parent_hash,
        })
        .into()
    );

    let expected_randao = *state.get_randao_mix(state.current_epoch())?;
    block_verify!(
        payload.prev_randao == expected_randao,
        BlockOperationError::invalid(ExecutionPayloadInvalid::PrevRandaoMismatch {
            state: expected_randao,
            payload: payload.prev_randao,
        })
        .into()
    );

    let expected_timestamp = compute_timestamp_at_slot(state, spec)?;
    block_verify!(
        payload.timestamp == expected_timestamp,
        BlockOperationError::invalid(ExecutionPayloadInvalid::TimestampMismatch {
            state: expected_timestamp,
            payload: payload.timestamp,
        })
        .into()
    );

    state.latest_execution_payload_header = ExecutionPayloadHeader::from(payload);

    Ok(())
}

/// The wall-clock time the payload at the state's slot must carry.
pub fn compute_timestamp_at_slot<T: EthSpec>(
    state: &BeaconState<T>,
    spec: &ChainSpec,
) -> Result<u64, safe_arith::ArithError> {
    let slots_since_genesis = state.slot.as_u64().safe_sub(spec.genesis_slot.as_u64())?;
    slots_since_genesis
        .safe_mul(spec.seconds_per_slot)
        .and_then(|since_genesis| state.genesis_time.safe_add(since_genesis))
}
