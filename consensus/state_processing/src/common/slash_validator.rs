use super::{decrease_balance, increase_balance, initiate_validator_exit};
use crate::ConsensusContext;
use safe_arith::SafeArith;
use types::consts::{PROPOSER_WEIGHT, WEIGHT_DENOMINATOR};
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec};

/// Slash the validator with index `slashed_index`.
pub fn slash_validator<T: EthSpec>(
    state: &mut BeaconState<T>,
    slashed_index: usize,
    opt_whistleblower_index: Option<usize>,
    ctxt: &mut ConsensusContext<T>,
    spec: &ChainSpec,
) -> Result<(), BeaconStateError> {
    let epoch = state.current_epoch();

    initiate_validator_exit(state, slashed_index, spec)?;

    let effective_balance = {
        let validator = state.get_validator_mut(slashed_index)?;
        validator.slashed = true;
        validator.withdrawable_epoch = std::cmp::max(
            validator.withdrawable_epoch,
            epoch.safe_add(T::epochs_per_slashings_vector() as u64)?,
        );
        validator.effective_balance
    };

    // Track the slashed balance in the ring for the proportional penalty later.
    let slashings_total = state.get_slashings_at(epoch)?.safe_add(effective_balance)?;
    state.set_slashings_at(epoch, slashings_total)?;

    decrease_balance(
        state,
        slashed_index,
        effective_balance.safe_div(spec.min_slashing_penalty_quotient)?,
    )?;

    // Apply proposer and whistleblower rewards.
    let proposer_index = ctxt
        .get_proposer_index(state, spec)
        .map_err(|_| BeaconStateError::UnableToDetermineProducer)? as usize;
    let whistleblower_index = opt_whistleblower_index.unwrap_or(proposer_index);
    let whistleblower_reward =
        effective_balance.safe_div(spec.whistleblower_reward_quotient)?;
    let proposer_reward = whistleblower_reward
        .safe_mul(PROPOSER_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR)?;

    increase_balance(state, proposer_index, proposer_reward)?;
    increase_balance(
        state,
        whistleblower_index,
        whistleblower_reward.safe_sub(proposer_reward)?,
    )?;

    Ok(())
}
