use crate::per_epoch_processing::justification_and_finalization_state::JustificationAndFinalizationState;
use errors::EpochProcessingError as Error;
pub use participation_cache::ParticipationCache;
use types::{BeaconState, ChainSpec, Checkpoint, EthSpec, RelativeEpoch};

pub mod effective_balance_updates;
pub mod epoch_processing_summary;
pub mod errors;
pub mod inactivity_updates;
pub mod justification_and_finalization;
pub mod justification_and_finalization_state;
pub mod participation_cache;
pub mod registry_updates;
pub mod resets;
pub mod rewards_and_penalties;
pub mod slashings;
pub mod sync_committee_updates;

pub use effective_balance_updates::process_effective_balance_updates;
pub use epoch_processing_summary::EpochProcessingSummary;
pub use inactivity_updates::process_inactivity_updates;
pub use justification_and_finalization::process_justification_and_finalization;
pub use registry_updates::process_registry_updates;
pub use resets::{
    process_eth1_data_reset, process_historical_roots_update, process_participation_flag_updates,
    process_randao_mixes_reset, process_slashings_reset,
};
pub use rewards_and_penalties::process_rewards_and_penalties;
pub use slashings::process_slashings;
pub use sync_committee_updates::process_sync_committee_updates;

/// Performs per-epoch processing on some BeaconState.
///
/// Mutates the given `BeaconState`, returning early if an error is encountered. If an error is
/// returned, a state might be "half-processed" and therefore in an invalid state.
pub fn process_epoch<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<EpochProcessingSummary, Error> {
    // Ensure the committee caches are built.
    state.build_committee_cache(RelativeEpoch::Previous, spec)?;
    state.build_committee_cache(RelativeEpoch::Current, spec)?;
    state.build_total_active_balance_cache(spec)?;

    // Pre-compute participating indices and total balances.
    let participation_cache = ParticipationCache::new(state, spec)?;

    // Justification and finalization.
    let justification_and_finalization_state =
        process_justification_and_finalization(state, &participation_cache)?;
    justification_and_finalization_state.apply_changes_to_state(state);

    process_inactivity_updates(state, &participation_cache, spec)?;

    // Rewards and Penalties.
    process_rewards_and_penalties(state, &participation_cache, spec)?;

    // Registry Updates.
    process_registry_updates(state, spec)?;

    // Slashings.
    process_slashings(
        state,
        participation_cache.current_epoch_total_active_balance(),
        spec,
    )?;

    // Reset eth1 data votes.
    process_eth1_data_reset(state)?;

    // Update effective balances with hysteresis (lag).
    process_effective_balance_updates(state, spec)?;

    // Reset slashings.
    process_slashings_reset(state)?;

    // Set randao mix.
    process_randao_mixes_reset(state)?;

    // Set historical root accumulator.
    process_historical_roots_update(state)?;

    // Rotate current/previous epoch participation.
    process_participation_flag_updates(state)?;

    // Rotate the sync committees at period boundaries.
    process_sync_committee_updates(state, spec)?;

    Ok(EpochProcessingSummary {
        total_active_balance: participation_cache.current_epoch_total_active_balance(),
        previous_epoch_target_attesting_balance: participation_cache
            .previous_epoch_target_attesting_balance()?,
        current_epoch_target_attesting_balance: participation_cache
            .current_epoch_target_attesting_balance()?,
    })
}

/// The justification and finalization the state would reach if epoch processing ran at this very
/// moment, without mutating the state.
///
/// Fork choice pulls these "unrealized" checkpoints up at epoch boundaries.
pub fn compute_unrealized_checkpoints<T: EthSpec>(
    state: &BeaconState<T>,
    spec: &ChainSpec,
) -> Result<(Checkpoint, Checkpoint), Error> {
    // Within an epoch of genesis the weigh function is a no-op and returns the state's own
    // checkpoints unchanged.
    let participation_cache = ParticipationCache::new(state, spec)?;

    let justification_and_finalization_state =
        process_justification_and_finalization(state, &participation_cache)?;

    Ok((
        justification_and_finalization_state.current_justified_checkpoint(),
        justification_and_finalization_state.finalized_checkpoint(),
    ))
}
