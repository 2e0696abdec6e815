use crate::max_cover::MaxCover;
use state_processing::common::get_attesting_indices;
use std::collections::HashMap;
use types::consts::TIMELY_TARGET_FLAG_INDEX;
use types::{Attestation, BeaconState, BeaconStateError, ChainSpec, EthSpec};

/// A wrapper around an `Attestation` that eagerly computes the set of attesting validators whose
/// votes are not already on-chain.
pub struct AttMaxCover<'a, T: EthSpec> {
    /// Underlying attestation.
    pub att: &'a Attestation<T>,
    /// Maps validator indices to their effective-balance increments for "fresh" votes.
    pub fresh_validators_rewards: HashMap<u64, u64>,
}

impl<'a, T: EthSpec> AttMaxCover<'a, T> {
    pub fn new(
        att: &'a Attestation<T>,
        state: &BeaconState<T>,
        spec: &ChainSpec,
    ) -> Option<Self> {
        let fresh_validators_rewards = earliest_attestation_validators(att, state, spec).ok()?;
        Some(Self {
            att,
            fresh_validators_rewards,
        })
    }
}

/// Returns the validators covered by `attestation` whose timely-target participation is not yet
/// recorded in `state`, mapped to their effective-balance increments.
///
/// An attestation which only repeats flags already on-chain scores zero and will never be
/// packed.
pub fn earliest_attestation_validators<T: EthSpec>(
    attestation: &Attestation<T>,
    state: &BeaconState<T>,
    spec: &ChainSpec,
) -> Result<HashMap<u64, u64>, BeaconStateError> {
    let target_epoch = attestation.data.target.epoch;
    let epoch_participation = if target_epoch == state.current_epoch() {
        &state.current_epoch_participation
    } else if target_epoch == state.previous_epoch() {
        &state.previous_epoch_participation
    } else {
        return Err(BeaconStateError::EpochOutOfBounds);
    };

    let committee = state.get_beacon_committee(attestation.data.slot, attestation.data.index)?;
    let attesting_indices =
        get_attesting_indices::<T>(committee.committee, &attestation.aggregation_bits)?;

    let mut fresh = HashMap::with_capacity(attesting_indices.len());
    for index in attesting_indices {
        let has_target_flag = epoch_participation
            .get(index as usize)
            .ok_or(BeaconStateError::ParticipationOutOfBounds(index as usize))?
            .has_flag(TIMELY_TARGET_FLAG_INDEX)?;
        if !has_target_flag {
            let increments =
                state.get_effective_balance(index as usize)? / spec.effective_balance_increment;
            fresh.insert(index, increments);
        }
    }

    Ok(fresh)
}

impl<'a, T: EthSpec> MaxCover for AttMaxCover<'a, T> {
    type Object = Attestation<T>;
    type Set = HashMap<u64, u64>;

    fn object(&self) -> Attestation<T> {
        self.att.clone()
    }

    fn covering_set(&self) -> &HashMap<u64, u64> {
        &self.fresh_validators_rewards
    }

    /// Only attestations for the same `(slot, index)` pair can overlap, so restrict the
    /// difference operation to those.
    fn update_covering_set(
        &mut self,
        best_att: &Attestation<T>,
        covered_validators: &HashMap<u64, u64>,
    ) {
        if self.att.data.slot == best_att.data.slot && self.att.data.index == best_att.data.index {
            self.fresh_validators_rewards
                .retain(|index, _| !covered_validators.contains_key(index));
        }
    }

    fn score(&self) -> usize {
        self.fresh_validators_rewards.values().sum::<u64>() as usize
    }
}
