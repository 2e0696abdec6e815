use super::compute_activation_exit_epoch;
use safe_arith::SafeArith;
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec};

/// Initiate the exit of the validator of the given `index`.
pub fn initiate_validator_exit<T: EthSpec>(
    state: &mut BeaconState<T>,
    index: usize,
    spec: &ChainSpec,
) -> Result<(), BeaconStateError> {
    // Return if the validator already initiated exit.
    if state.get_validator(index)?.exit_epoch != spec.far_future_epoch {
        return Ok(());
    }

    // The earliest exit epoch considering the activation-exit delay.
    let delayed_epoch = compute_activation_exit_epoch(state.current_epoch(), spec)?;

    // Compute the current exit queue head and how many validators already occupy it.
    let mut exit_queue_epoch = delayed_epoch;
    let mut exit_queue_churn = 0u64;
    for validator in state.validators.iter() {
        if validator.exit_epoch != spec.far_future_epoch {
            if validator.exit_epoch > exit_queue_epoch {
                exit_queue_epoch = validator.exit_epoch;
                exit_queue_churn = 1;
            } else if validator.exit_epoch == exit_queue_epoch {
                exit_queue_churn.safe_add_assign(1)?;
            }
        }
    }

    if exit_queue_churn >= state.get_churn_limit(spec)? {
        exit_queue_epoch.safe_add_assign(1u64)?;
    }

    let validator = state.get_validator_mut(index)?;
    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch = spec.withdrawable_epoch(exit_queue_epoch);

    Ok(())
}
