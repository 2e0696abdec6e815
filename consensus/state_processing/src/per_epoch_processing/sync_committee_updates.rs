use super::errors::EpochProcessingError as Error;
use safe_arith::SafeArith;
use std::sync::Arc;
use types::{BeaconState, ChainSpec, EthSpec};

/// Rotate the sync committees at the start of each sync-committee period.
pub fn process_sync_committee_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let next_epoch = state.next_epoch();
    if next_epoch
        .as_u64()
        .safe_rem(spec.epochs_per_sync_committee_period.as_u64())?
        == 0
    {
        state.current_sync_committee = state.next_sync_committee.clone();
        state.next_sync_committee = Arc::new(state.get_next_sync_committee(spec)?);
    }
    Ok(())
}
