use crate::per_block_processing::errors::{AttestationInvalid, BlockOperationError};
use integer_sqrt::IntegerSquareRoot;
use smallvec::SmallVec;
use types::consts::{
    NUM_FLAG_INDICES, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
};
use types::{AttestationData, BeaconState, ChainSpec, EthSpec};

type Result<T> = std::result::Result<T, BlockOperationError<AttestationInvalid>>;

/// Which participation flags an attestation earns, given how quickly it was included.
///
/// The source vote must match the state's justified checkpoint; timeliness then determines the
/// target and head flags.
pub fn get_attestation_participation_flag_indices<T: EthSpec>(
    state: &BeaconState<T>,
    data: &AttestationData,
    inclusion_delay: u64,
    spec: &ChainSpec,
) -> Result<SmallVec<[usize; NUM_FLAG_INDICES]>> {
    let justified_checkpoint = if data.target.epoch == state.current_epoch() {
        state.current_justified_checkpoint
    } else {
        state.previous_justified_checkpoint
    };

    let is_matching_source = data.source == justified_checkpoint;
    let is_matching_target = is_matching_source
        && data.target.root == *state.get_block_root_at_epoch(data.target.epoch)?;
    let is_matching_head =
        is_matching_target && data.beacon_block_root == *state.get_block_root(data.slot)?;

    if !is_matching_source {
        return Err(BlockOperationError::invalid(
            AttestationInvalid::WrongJustifiedCheckpoint {
                state: Box::new(justified_checkpoint),
                attestation: Box::new(data.source),
                is_current: data.target.epoch == state.current_epoch(),
            },
        ));
    }

    let mut participation_flag_indices = SmallVec::new();
    if is_matching_source && inclusion_delay <= T::slots_per_epoch().integer_sqrt() {
        participation_flag_indices.push(TIMELY_SOURCE_FLAG_INDEX);
    }
    if is_matching_target && inclusion_delay <= T::slots_per_epoch() {
        participation_flag_indices.push(TIMELY_TARGET_FLAG_INDEX);
    }
    if is_matching_head && inclusion_delay == spec.min_attestation_inclusion_delay {
        participation_flag_indices.push(TIMELY_HEAD_FLAG_INDEX);
    }
    Ok(participation_flag_indices)
}
