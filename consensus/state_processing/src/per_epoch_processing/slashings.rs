use super::errors::EpochProcessingError as Error;
use crate::common::decrease_balance;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec};

/// Process slashings.
///
/// Validators whose withdrawable epoch lies exactly half a slashings-vector ahead receive the
/// proportional penalty derived from the slashings ring sum.
pub fn process_slashings<T: EthSpec>(
    state: &mut BeaconState<T>,
    total_balance: u64,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let epoch = state.current_epoch();
    let sum_slashings = state.get_total_slashings();

    let adjusted_total_slashing_balance = std::cmp::min(
        sum_slashings.safe_mul(spec.proportional_slashing_multiplier)?,
        total_balance,
    );

    let target_withdrawable_epoch =
        epoch.safe_add(T::epochs_per_slashings_vector() as u64 / 2)?;

    let penalties: Vec<(usize, u64)> = state
        .validators
        .iter()
        .enumerate()
        .filter(|(_, validator)| {
            validator.slashed && target_withdrawable_epoch == validator.withdrawable_epoch
        })
        .map(|(index, validator)| {
            let increment = spec.effective_balance_increment;
            let penalty_numerator = validator
                .effective_balance
                .safe_div(increment)?
                .safe_mul(adjusted_total_slashing_balance)?;
            let penalty = penalty_numerator
                .safe_div(total_balance)?
                .safe_mul(increment)?;
            Ok((index, penalty))
        })
        .collect::<Result<_, Error>>()?;

    for (index, penalty) in penalties {
        decrease_balance(state, index, penalty)?;
    }

    Ok(())
}
