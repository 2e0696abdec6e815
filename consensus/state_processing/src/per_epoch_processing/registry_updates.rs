use super::errors::EpochProcessingError as Error;
use crate::common::{compute_activation_exit_epoch, initiate_validator_exit};
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec};

/// Performs a validator registry update, if required.
///
/// Marks newly-eligible validators, ejects under-collateralized ones and dequeues activations up
/// to the churn limit.
pub fn process_registry_updates<T: EthSpec>(
    state: &mut BeaconState<T>,
    spec: &ChainSpec,
) -> Result<(), Error> {
    // Process activation eligibility and ejections.
    //
    // Collect eligible and exiting validators first, then mutate, to satisfy the borrow checker.
    let current_epoch = state.current_epoch();
    let is_ejectable = |validator: &types::Validator| {
        validator.is_active_at(current_epoch)
            && validator.effective_balance <= spec.ejection_balance
    };
    let indices_to_update: Vec<usize> = state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| {
            validator.is_eligible_for_activation_queue(spec) || is_ejectable(validator)
        })
        .map(|(idx, _)| idx)
        .collect();

    for index in indices_to_update {
        if state
            .get_validator(index)?
            .is_eligible_for_activation_queue(spec)
        {
            state.get_validator_mut(index)?.activation_eligibility_epoch =
                current_epoch.safe_add(1u64)?;
        }
        if is_ejectable(state.get_validator(index)?) {
            initiate_validator_exit(state, index, spec)?;
        }
    }

    // Queue validators eligible for activation and not yet dequeued for activation.
    let mut activation_queue = state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| {
            validator.is_eligible_for_activation(state.finalized_checkpoint.epoch, spec)
        })
        // Order by the sequence of activation_eligibility_epoch setting and then index.
        .map(|(index, validator)| (validator.activation_eligibility_epoch, index))
        .collect::<Vec<_>>();
    activation_queue.sort_unstable();

    // Dequeue validators for activation up to churn limit.
    let churn_limit = state.get_churn_limit(spec)? as usize;
    let delayed_activation_epoch = compute_activation_exit_epoch(current_epoch, spec)?;
    for (_, index) in activation_queue.into_iter().take(churn_limit) {
        state.get_validator_mut(index)?.activation_epoch = delayed_activation_epoch;
    }

    Ok(())
}
