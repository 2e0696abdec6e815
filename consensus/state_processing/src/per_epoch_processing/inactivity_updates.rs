use super::errors::EpochProcessingError as Error;
use super::participation_cache::ParticipationCache;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec};

/// Nudge every eligible validator's inactivity score: down towards zero while it participates,
/// up while it does not, with an extra recovery decrement outside inactivity leaks.
pub fn process_inactivity_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), Error> {
    // Score updates based on the previous epoch's participation only begin one epoch after
    // genesis.
    if state.current_epoch() == T::genesis_epoch() {
        return Ok(());
    }

    let in_inactivity_leak = is_in_inactivity_leak(state, spec);

    for &index in participation_cache.eligible_validator_indices() {
        // Increase the inactivity score of inactive validators
        if participation_cache.is_previous_epoch_timely_target_attester(index) {
            let inactivity_score = state.get_inactivity_score_mut(index)?;
            *inactivity_score = inactivity_score.saturating_sub(1);
        } else {
            state
                .get_inactivity_score_mut(index)?
                .safe_add_assign(spec.inactivity_score_bias)?;
        }

        // Decrease the inactivity score of all eligible validators during a leak-free epoch.
        if !in_inactivity_leak {
            let inactivity_score = state.get_inactivity_score_mut(index)?;
            *inactivity_score =
                inactivity_score.saturating_sub(spec.inactivity_score_recovery_rate);
        }
    }

    Ok(())
}

/// Returns `true` when finality has been lagging for longer than
/// `MIN_EPOCHS_TO_INACTIVITY_PENALTY` epochs.
pub fn is_in_inactivity_leak<T: EthSpec>(state: &BeaconState<T>, spec: &ChainSpec) -> bool {
    let finality_delay = state
        .previous_epoch()
        .saturating_sub(state.finalized_checkpoint.epoch)
        .as_u64();
    finality_delay > spec.min_epochs_to_inactivity_penalty
}
