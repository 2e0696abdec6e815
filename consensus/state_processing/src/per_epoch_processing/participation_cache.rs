//! Provides the `ParticipationCache`, a cache which attempts to reduce CPU and memory usage by:
//!
//! - Caching a map of `validator_index -> participation_flags` for all active validators in the
//!   previous and current epochs.
//! - Caching the total balances of:
//!   - All active validators.
//!   - All active validators matching each of the three "timely" flags.
//! - Caching the "eligible" validators.

use safe_arith::{ArithError, SafeArith};
use std::collections::HashMap;
use types::consts::{
    NUM_FLAG_INDICES, TIMELY_HEAD_FLAG_INDEX, TIMELY_SOURCE_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX,
};
use types::{
    BeaconState, BeaconStateError, ChainSpec, Epoch, EthSpec, ParticipationFlags,
};

/// A balance which will never be below the specified `minimum`.
///
/// This is an attempt to ensure the `EFFECTIVE_BALANCE_INCREMENT` minimum is always respected.
#[derive(PartialEq, Debug, Clone, Copy)]
struct Balance {
    raw: u64,
    minimum: u64,
}

impl Balance {
    /// Initialize the balance to `0`, or the given `minimum`.
    pub fn zero(minimum: u64) -> Self {
        Self { raw: 0, minimum }
    }

    /// Returns the balance with respect to the initialization `minimum`.
    pub fn get(&self) -> u64 {
        std::cmp::max(self.raw, self.minimum)
    }

    /// Add-assign to the balance.
    pub fn safe_add_assign(&mut self, other: u64) -> Result<(), ArithError> {
        self.raw.safe_add_assign(other)
    }
}

/// Caches the participation values for one epoch (either the previous or current).
#[derive(PartialEq, Debug)]
struct SingleEpochParticipationCache {
    /// Maps an active validator index to their participation flags.
    ///
    /// To reiterate, only active validator indices are stored in this map.
    unslashed_participating_indices: HashMap<usize, ParticipationFlags>,
    /// Stores the sum of the balances for all validators in
    /// `self.unslashed_participating_indices` for all flags in `NUM_FLAG_INDICES`.
    ///
    /// A flag balance is only incremented if a validator has that flag set.
    total_flag_balances: [Balance; NUM_FLAG_INDICES],
    /// Stores the sum of all balances of all validators in
    /// `self.unslashed_participating_indices` (regardless of which flags are set).
    total_active_balance: Balance,
}

impl SingleEpochParticipationCache {
    fn new(capacity: usize, spec: &ChainSpec) -> Self {
        let zero_balance = Balance::zero(spec.effective_balance_increment);

        Self {
            unslashed_participating_indices: HashMap::with_capacity(capacity),
            total_flag_balances: [zero_balance; NUM_FLAG_INDICES],
            total_active_balance: zero_balance,
        }
    }

    /// Process an **active** validator.
    ///
    /// ## Warning
    ///
    /// It is a logic error to provide an inactive validator to this function.
    fn process_active_validator<T: EthSpec>(
        &mut self,
        val_index: usize,
        state: &BeaconState<T>,
        epoch_participation: &[ParticipationFlags],
    ) -> Result<(), BeaconStateError> {
        let val_balance = state.get_effective_balance(val_index)?;

        // All active validators increase the total active balance.
        self.total_active_balance.safe_add_assign(val_balance)?;

        if state.get_validator(val_index)?.slashed {
            return Ok(());
        }

        // Iterate through all the flags and increment the total flag balances for whichever flags
        // are set for `val_index`.
        let participation_flags = epoch_participation
            .get(val_index)
            .ok_or(BeaconStateError::ParticipationOutOfBounds(val_index))?;
        for (flag, balance) in self.total_flag_balances.iter_mut().enumerate() {
            if participation_flags.has_flag(flag)? {
                balance.safe_add_assign(val_balance)?;
            }
        }

        // The validator is active and unslashed, add their `ParticipationFlags` to the map.
        self.unslashed_participating_indices
            .insert(val_index, *participation_flags);

        Ok(())
    }
}

/// Maintains a cache to be used during epoch processing.
#[derive(PartialEq, Debug)]
pub struct ParticipationCache {
    current_epoch: Epoch,
    /// Caches information about active validators pertaining to `self.current_epoch`.
    current_epoch_participation: SingleEpochParticipationCache,
    previous_epoch: Epoch,
    /// Caches information about active validators pertaining to `self.previous_epoch`.
    previous_epoch_participation: SingleEpochParticipationCache,
    /// Caches the result of the `get_eligible_validator_indices` function.
    eligible_indices: Vec<usize>,
}

impl ParticipationCache {
    /// Instantiate `Self`, returning a cache that is fully initialized and ready-to-go.
    pub fn new<T: EthSpec>(
        state: &BeaconState<T>,
        spec: &ChainSpec,
    ) -> Result<Self, BeaconStateError> {
        let current_epoch = state.current_epoch();
        let previous_epoch = state.previous_epoch();

        let mut current_epoch_participation =
            SingleEpochParticipationCache::new(state.validators.len(), spec);
        let mut previous_epoch_participation =
            SingleEpochParticipationCache::new(state.validators.len(), spec);
        let mut eligible_indices = Vec::with_capacity(state.validators.len());

        for (val_index, val) in state.validators.iter().enumerate() {
            if val.is_active_at(current_epoch) {
                current_epoch_participation.process_active_validator(
                    val_index,
                    state,
                    &state.current_epoch_participation,
                )?;
            }

            if val.is_active_at(previous_epoch) {
                previous_epoch_participation.process_active_validator(
                    val_index,
                    state,
                    &state.previous_epoch_participation,
                )?;
            }

            // Spec: `get_eligible_validator_indices`.
            if val.is_active_at(previous_epoch)
                || (val.slashed && previous_epoch.saturating_add(1u64) < val.withdrawable_epoch)
            {
                eligible_indices.push(val_index);
            }
        }

        Ok(Self {
            current_epoch,
            current_epoch_participation,
            previous_epoch,
            previous_epoch_participation,
            eligible_indices,
        })
    }

    /// Equivalent to the specification `get_eligible_validator_indices` function.
    pub fn eligible_validator_indices(&self) -> &[usize] {
        &self.eligible_indices
    }

    pub fn current_epoch_total_active_balance(&self) -> u64 {
        self.current_epoch_participation.total_active_balance.get()
    }

    pub fn previous_epoch_total_active_balance(&self) -> u64 {
        self.previous_epoch_participation.total_active_balance.get()
    }

    fn flag_attesting_balance(
        &self,
        participation: &SingleEpochParticipationCache,
        flag_index: usize,
    ) -> Result<u64, BeaconStateError> {
        participation
            .total_flag_balances
            .get(flag_index)
            .map(Balance::get)
            .ok_or(BeaconStateError::ParticipationOutOfBounds(flag_index))
    }

    pub fn previous_epoch_flag_attesting_balance(
        &self,
        flag_index: usize,
    ) -> Result<u64, BeaconStateError> {
        self.flag_attesting_balance(&self.previous_epoch_participation, flag_index)
    }

    pub fn previous_epoch_target_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.previous_epoch_flag_attesting_balance(TIMELY_TARGET_FLAG_INDEX)
    }

    pub fn previous_epoch_head_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.previous_epoch_flag_attesting_balance(TIMELY_HEAD_FLAG_INDEX)
    }

    pub fn previous_epoch_source_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.previous_epoch_flag_attesting_balance(TIMELY_SOURCE_FLAG_INDEX)
    }

    pub fn current_epoch_target_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.flag_attesting_balance(&self.current_epoch_participation, TIMELY_TARGET_FLAG_INDEX)
    }

    /// Has `val_index` both the flag set in the previous epoch and is unslashed?
    fn has_previous_epoch_flag(&self, val_index: usize, flag_index: usize) -> bool {
        self.previous_epoch_participation
            .unslashed_participating_indices
            .get(&val_index)
            .and_then(|flags| flags.has_flag(flag_index).ok())
            .unwrap_or(false)
    }

    pub fn is_previous_epoch_timely_source_attester(&self, val_index: usize) -> bool {
        self.has_previous_epoch_flag(val_index, TIMELY_SOURCE_FLAG_INDEX)
    }

    pub fn is_previous_epoch_timely_target_attester(&self, val_index: usize) -> bool {
        self.has_previous_epoch_flag(val_index, TIMELY_TARGET_FLAG_INDEX)
    }

    pub fn is_previous_epoch_timely_head_attester(&self, val_index: usize) -> bool {
        self.has_previous_epoch_flag(val_index, TIMELY_HEAD_FLAG_INDEX)
    }

    /// Is `val_index` an unslashed participant with `flag_index` set in the previous epoch?
    pub fn is_unslashed_participating_index(
        &self,
        val_index: usize,
        flag_index: usize,
    ) -> bool {
        self.has_previous_epoch_flag(val_index, flag_index)
    }
}
