//! A helper to advance a state to a target slot without applying any blocks, computing state
//! roots faithfully along the way.

use crate::per_slot_processing::{per_slot_processing, Error as SlotProcessingError};
use types::{BeaconState, ChainSpec, EthSpec, Hash256, Slot};

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    BadTargetSlot { target_slot: Slot, state_slot: Slot },
    SlotProcessing(SlotProcessingError),
}

impl From<SlotProcessingError> for Error {
    fn from(e: SlotProcessingError) -> Self {
        Self::SlotProcessing(e)
    }
}

/// Advances the `state` to the given `target_slot`, assuming that there were no blocks between
/// these slots.
///
/// If the root of the state at its current slot is already known it can be passed as
/// `state_root_opt` to avoid one full tree hash.
///
/// ## Errors
///
/// Returns an error if `state.slot > target_slot`. Does not modify the state in that case.
pub fn complete_state_advance<T: EthSpec>(
    state: &mut BeaconState<T>,
    mut state_root_opt: Option<Hash256>,
    target_slot: Slot,
    spec: &ChainSpec,
) -> Result<(), Error> {
    if state.slot > target_slot {
        return Err(Error::BadTargetSlot {
            target_slot,
            state_slot: state.slot,
        });
    }

    while state.slot < target_slot {
        // Use the initial state root on the first iteration only; subsequent roots must be
        // computed from the mutated state.
        let state_root = state_root_opt.take();

        per_slot_processing(state, state_root, spec)?;
    }

    Ok(())
}
