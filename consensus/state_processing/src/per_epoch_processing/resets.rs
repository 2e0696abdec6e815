use super::errors::EpochProcessingError as Error;
use safe_arith::SafeArith;
use ssz_types::VariableList;
use tree_hash::TreeHash;
use types::{BeaconState, EthSpec, HistoricalBatch, Unsigned};

/// Clear the eth1 data votes at the end of each voting period.
pub fn process_eth1_data_reset<T: EthSpec>(state: &mut BeaconState<T>) -> Result<(), Error> {
    if state
        .slot
        .safe_add(1u64)?
        .safe_rem(T::SlotsPerEth1VotingPeriod::to_u64())?
        == 0
    {
        state.eth1_data_votes = VariableList::empty();
    }
    Ok(())
}

/// Zero the slashings-ring bucket the next epoch will accumulate into.
pub fn process_slashings_reset<T: EthSpec>(state: &mut BeaconState<T>) -> Result<(), Error> {
    let next_epoch = state.next_epoch();
    state.set_slashings_at(next_epoch, 0)?;
    Ok(())
}

/// Advance the randao accumulator: the next epoch starts from the current epoch's mix.
pub fn process_randao_mixes_reset<T: EthSpec>(state: &mut BeaconState<T>) -> Result<(), Error> {
    let current_epoch = state.current_epoch();
    let next_epoch = state.next_epoch();
    let mix = *state.get_randao_mix(current_epoch)?;
    state.set_randao_mix(next_epoch, mix)?;
    Ok(())
}

/// Accumulate the block/state root rings into `historical_roots` once per ring length.
pub fn process_historical_roots_update<T: EthSpec>(
    state: &mut BeaconState<T>,
) -> Result<(), Error> {
    let next_epoch = state.next_epoch();
    if next_epoch
        .as_u64()
        .safe_rem(T::SlotsPerHistoricalRoot::to_u64().safe_div(T::slots_per_epoch())?)?
        == 0
    {
        let historical_batch = HistoricalBatch::<T> {
            block_roots: state.block_roots.clone(),
            state_roots: state.state_roots.clone(),
        };
        state
            .historical_roots
            .push(historical_batch.tree_hash_root())?;
    }
    Ok(())
}

/// Rotate the participation flags: current becomes previous, current resets to empty.
pub fn process_participation_flag_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
) -> Result<(), Error> {
    state.previous_epoch_participation =
        std::mem::take(&mut state.current_epoch_participation);
    state.current_epoch_participation =
        VariableList::new(vec![Default::default(); state.validators.len()])?;
    Ok(())
}
