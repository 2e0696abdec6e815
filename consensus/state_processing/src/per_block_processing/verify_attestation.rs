use super::errors::{AttestationInvalid as Invalid, BlockOperationError};
use super::is_valid_indexed_attestation::is_valid_indexed_attestation;
use super::VerifySignatures;
use crate::common::get_indexed_attestation;
use safe_arith::SafeArith;
use types::{Attestation, BeaconState, ChainSpec, EthSpec, IndexedAttestation};

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Returns the indexed form of `attestation` if it is valid for inclusion in a block at the
/// state's current slot, otherwise an error describing why it is not.
pub fn verify_attestation_for_block_inclusion<T: EthSpec>(
    state: &BeaconState<T>,
    attestation: &Attestation<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<IndexedAttestation<T>> {
    let data = &attestation.data;

    verify!(
        !attestation.aggregation_bits.is_zero(),
        Invalid::AggregationBitfieldIsEmpty
    );

    // Inclusion window: [slot + MIN_ATTESTATION_INCLUSION_DELAY, slot + SLOTS_PER_EPOCH].
    verify!(
        data.slot.safe_add(spec.min_attestation_inclusion_delay)? <= state.slot,
        Invalid::IncludedTooEarly {
            state: state.slot,
            delay: spec.min_attestation_inclusion_delay,
            attestation: data.slot,
        }
    );
    verify!(
        state.slot <= data.slot.safe_add(T::slots_per_epoch())?,
        Invalid::IncludedTooLate {
            state: state.slot,
            attestation: data.slot,
        }
    );

    verify!(
        data.target.epoch == state.previous_epoch() || data.target.epoch == state.current_epoch(),
        Invalid::BadTargetEpoch
    );
    verify!(
        data.target.epoch == data.slot.epoch(T::slots_per_epoch()),
        Invalid::TargetEpochSlotMismatch {
            target_epoch: data.target.epoch,
            slot_epoch: data.slot.epoch(T::slots_per_epoch()),
        }
    );

    let committee = state
        .get_beacon_committee(data.slot, data.index)
        .map_err(|_| error(Invalid::BadCommitteeIndex))?;
    verify!(
        attestation.aggregation_bits.len() == committee.committee.len(),
        Invalid::BadAggregationBitfieldLength {
            committee_len: committee.committee.len(),
            bitfield_len: attestation.aggregation_bits.len(),
        }
    );

    let indexed_attestation = get_indexed_attestation(committee.committee, attestation)?;
    is_valid_indexed_attestation(state, &indexed_attestation, verify_signatures, spec)
        .map_err(|e| match e {
            BlockOperationError::Invalid(reason) => error(Invalid::BadIndexedAttestation(reason)),
            BlockOperationError::BeaconStateError(e) => BlockOperationError::BeaconStateError(e),
            BlockOperationError::SszTypesError(e) => BlockOperationError::SszTypesError(e),
            BlockOperationError::ArithError(e) => BlockOperationError::ArithError(e),
        })?;

    Ok(indexed_attestation)
}
