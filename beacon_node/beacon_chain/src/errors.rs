use crate::beacon_fork_choice_store;
use types::{BeaconStateError, Hash256, Slot};

/// Internal, non-recoverable errors of the orchestrator.
///
/// These indicate either a bug or local corruption, never an invalid inbound object (which is
/// reported through `ReceiveOutcome` instead).
#[derive(Debug)]
pub enum BeaconChainError {
    StoreError(store::Error),
    ForkChoiceStoreError(beacon_fork_choice_store::Error),
    BeaconStateError(BeaconStateError),
    SlotProcessingError(state_processing::SlotProcessingError),
    StateAdvanceError(state_processing::state_advance::Error),
    MissingBeaconBlock(Hash256),
    MissingBeaconState(Hash256),
    /// The parent chain needed for replay is not contiguous in the store.
    MissingReplayAncestor {
        block_root: Hash256,
    },
    HeadMissingFromForkChoice(Hash256),
    ForkChoice(String),
    CannotAdvancePastSlot {
        target_slot: Slot,
        state_slot: Slot,
    },
    ObserverPanic,
}

impl From<store::Error> for BeaconChainError {
    fn from(e: store::Error) -> Self {
        BeaconChainError::StoreError(e)
    }
}

impl From<beacon_fork_choice_store::Error> for BeaconChainError {
    fn from(e: beacon_fork_choice_store::Error) -> Self {
        BeaconChainError::ForkChoiceStoreError(e)
    }
}

impl From<BeaconStateError> for BeaconChainError {
    fn from(e: BeaconStateError) -> Self {
        BeaconChainError::BeaconStateError(e)
    }
}

impl From<state_processing::SlotProcessingError> for BeaconChainError {
    fn from(e: state_processing::SlotProcessingError) -> Self {
        BeaconChainError::SlotProcessingError(e)
    }
}

impl From<state_processing::state_advance::Error> for BeaconChainError {
    fn from(e: state_processing::state_advance::Error) -> Self {
        BeaconChainError::StateAdvanceError(e)
    }
}
