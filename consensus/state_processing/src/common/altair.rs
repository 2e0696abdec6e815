use integer_sqrt::IntegerSquareRoot;
use safe_arith::{ArithError, SafeArith};
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec};

/// The base reward awarded per effective-balance increment.
///
/// Computed once per state rather than once per validator; the integer square root dominates
/// the cost.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct BaseRewardPerIncrement(u64);

impl BaseRewardPerIncrement {
    pub fn new(total_active_balance: u64, spec: &ChainSpec) -> Result<Self, ArithError> {
        spec.effective_balance_increment
            .safe_mul(spec.base_reward_factor)?
            .safe_div(total_active_balance.integer_sqrt())
            .map(Self)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// The base reward for a single validator, proportional to its effective balance.
pub fn get_base_reward<T: EthSpec>(
    state: &BeaconState<T>,
    index: usize,
    base_reward_per_increment: BaseRewardPerIncrement,
    spec: &ChainSpec,
) -> Result<u64, BeaconStateError> {
    state
        .get_effective_balance(index)?
        .safe_div(spec.effective_balance_increment)?
        .safe_mul(base_reward_per_increment.as_u64())
        .map_err(Into::into)
}
