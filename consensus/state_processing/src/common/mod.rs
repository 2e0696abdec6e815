pub mod altair;
mod get_attestation_participation;
mod get_attesting_indices;
mod get_indexed_attestation;
mod initiate_validator_exit;
mod slash_validator;

pub use get_attestation_participation::get_attestation_participation_flag_indices;
pub use get_attesting_indices::get_attesting_indices;
pub use get_indexed_attestation::get_indexed_attestation;
pub use initiate_validator_exit::initiate_validator_exit;
pub use slash_validator::slash_validator;

use safe_arith::{ArithError, SafeArith};
use types::{BeaconState, BeaconStateError, ChainSpec, Epoch, EthSpec};

/// Increase the balance of a validator, erroring upon overflow, as per the spec.
pub fn increase_balance<E: EthSpec>(
    state: &mut BeaconState<E>,
    index: usize,
    delta: u64,
) -> Result<(), BeaconStateError> {
    state.get_balance_mut(index)?.safe_add_assign(delta)?;
    Ok(())
}

/// Decrease the balance of a validator, saturating upon underflow, as per the spec.
pub fn decrease_balance<E: EthSpec>(
    state: &mut BeaconState<E>,
    index: usize,
    delta: u64,
) -> Result<(), BeaconStateError> {
    let balance = state.get_balance_mut(index)?;
    *balance = balance.saturating_sub(delta);
    Ok(())
}

/// The earliest epoch a newly-activated (or newly-exiting) validator takes effect.
pub fn compute_activation_exit_epoch(
    epoch: Epoch,
    spec: &ChainSpec,
) -> Result<Epoch, ArithError> {
    epoch
        .safe_add(1u64)?
        .safe_add(spec.max_seed_lookahead.as_u64())
}
