use super::errors::{BlockOperationError, SyncAggregateInvalid as Invalid};
use super::VerifySignatures;
use crate::common::{altair::BaseRewardPerIncrement, decrease_balance, increase_balance};
use bls::AggregateSignature;
use safe_arith::SafeArith;
use tree_hash::TreeHash;
use types::consts::{PROPOSER_WEIGHT, SYNC_REWARD_WEIGHT, WEIGHT_DENOMINATOR};
use types::{BeaconState, ChainSpec, Domain, EthSpec, SigningData, SyncAggregate};

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Verify the sync aggregate against the current sync committee, then credit participants and
/// the proposer and debit absentees.
pub fn process_sync_aggregate<T: EthSpec>(
    state: &mut BeaconState<T>,
    aggregate: &SyncAggregate<T>,
    proposer_index: u64,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<()> {
    let committee = state.current_sync_committee.clone();

    if verify_signatures.is_true() {
        // The aggregate signs the parent beacon block root, over the previous slot's domain.
        let previous_slot = state.slot.saturating_sub(1u64);
        let domain = spec.get_domain(
            previous_slot.epoch(T::slots_per_epoch()),
            Domain::SyncCommittee,
            &state.fork,
            state.genesis_validators_root,
        );
        let parent_root = *state
            .get_block_root(previous_slot)
            .map_err(BlockOperationError::BeaconStateError)?;
        let message = SigningData {
            object_root: parent_root,
            domain,
        }
        .tree_hash_root();

        let participant_pubkeys = committee
            .pubkeys
            .iter()
            .zip(aggregate.sync_committee_bits.iter())
            .filter(|(_, bit)| *bit)
            .map(|(pubkey, _)| pubkey.decompress().ok())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| error(Invalid::ParticipantPubkeyInvalid))?;

        if !participant_pubkeys.is_empty() {
            let pubkey_refs = participant_pubkeys.iter().collect::<Vec<_>>();
            let signature =
                AggregateSignature::deserialize(&aggregate.sync_committee_signature.serialize())
                    .map_err(|_| error(Invalid::SignatureInvalid))?;

            verify!(
                signature.fast_aggregate_verify(message, &pubkey_refs),
                Invalid::SignatureInvalid
            );
        } else {
            // An empty participation set must carry the infinity signature.
            verify!(
                aggregate.sync_committee_signature.is_infinity(),
                Invalid::SignatureInvalid
            );
        }
    }

    // Compute participant and proposer rewards.
    let (participant_reward, proposer_reward) = compute_sync_aggregate_rewards(state, spec)?;

    // Apply participant and proposer rewards.
    //
    // Every seat is rewarded or penalized, including repeat seats held by the same validator.
    state.update_pubkey_cache()?;
    let mut proposer_balance = state.get_balance(proposer_index as usize)?;

    for (participant_pubkey, participation_bit) in committee
        .pubkeys
        .iter()
        .zip(aggregate.sync_committee_bits.iter())
    {
        let participant_index = state
            .get_validator_index(participant_pubkey)?
            .ok_or_else(|| error(Invalid::ParticipantPubkeyInvalid))?;

        if participation_bit {
            // A proposer in the sync committee can reward itself.
            if participant_index == proposer_index as usize {
                proposer_balance.safe_add_assign(participant_reward)?;
            } else {
                increase_balance(state, participant_index, participant_reward)?;
            }
            proposer_balance.safe_add_assign(proposer_reward)?;
        } else if participant_index == proposer_index as usize {
            proposer_balance = proposer_balance.saturating_sub(participant_reward);
        } else {
            decrease_balance(state, participant_index, participant_reward)?;
        }
    }

    *state.get_balance_mut(proposer_index as usize)? = proposer_balance;

    Ok(())
}

/// Compute the `(participant_reward, proposer_reward)` for a sync aggregate.
pub fn compute_sync_aggregate_rewards<T: EthSpec>(
    state: &BeaconState<T>,
    spec: &ChainSpec,
) -> Result<(u64, u64)> {
    let total_active_balance = state
        .get_total_active_balance()
        .map_err(BlockOperationError::BeaconStateError)?;
    let total_active_increments =
        total_active_balance.safe_div(spec.effective_balance_increment)?;
    let base_reward_per_increment = BaseRewardPerIncrement::new(total_active_balance, spec)?;

    let total_base_rewards = base_reward_per_increment
        .as_u64()
        .safe_mul(total_active_increments)?;
    let max_participant_rewards = total_base_rewards
        .safe_mul(SYNC_REWARD_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR)?
        .safe_div(T::slots_per_epoch())?;
    let participant_reward = max_participant_rewards.safe_div(T::sync_committee_size() as u64)?;
    let proposer_reward = participant_reward
        .safe_mul(PROPOSER_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR.safe_sub(PROPOSER_WEIGHT)?)?;

    Ok((participant_reward, proposer_reward))
}
