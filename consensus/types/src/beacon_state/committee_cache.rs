use crate::{
    AttestationDuty, BeaconCommittee, BeaconState, BeaconStateError as Error, ChainSpec,
    CommitteeIndex, Domain, Epoch, EthSpec, Slot,
};
use serde_derive::{Deserialize, Serialize};
use std::ops::Range;
use swap_or_not_shuffle::shuffle_list;

/// Computes and stores the shuffling for an epoch. Provides various getters to allow callers to
/// read the committees for the given epoch.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct CommitteeCache {
    initialized_epoch: Option<Epoch>,
    shuffling: Vec<usize>,
    shuffling_positions: Vec<Option<usize>>,
    committees_per_slot: u64,
    slots_per_epoch: u64,
}

impl CommitteeCache {
    /// Return a new, fully initialized cache.
    pub fn initialized<T: EthSpec>(
        state: &BeaconState<T>,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<CommitteeCache, Error> {
        // The shuffling for `epoch` is determined by the randao mix at the end of
        // `epoch - MIN_SEED_LOOKAHEAD - 1`; building further ahead than the next epoch is
        // unsound.
        if epoch > state.next_epoch() {
            return Err(Error::EpochOutOfBounds);
        }

        let active_validator_indices = state.get_active_validator_indices(epoch);
        if active_validator_indices.is_empty() {
            return Err(Error::InsufficientValidators);
        }

        let committees_per_slot =
            Self::committees_per_slot::<T>(active_validator_indices.len(), spec);

        let seed = state.get_seed(epoch, Domain::BeaconAttester, spec)?;

        let shuffling = shuffle_list(
            active_validator_indices,
            spec.shuffle_round_count,
            seed.as_bytes(),
            true,
        )
        .ok_or(Error::UnableToShuffle)?;

        let mut shuffling_positions = vec![None; state.validators.len()];
        for (position, &validator_index) in shuffling.iter().enumerate() {
            *shuffling_positions
                .get_mut(validator_index)
                .ok_or(Error::ShuffleIndexOutOfBounds(validator_index))? = Some(position);
        }

        Ok(CommitteeCache {
            initialized_epoch: Some(epoch),
            shuffling,
            shuffling_positions,
            committees_per_slot,
            slots_per_epoch: T::slots_per_epoch(),
        })
    }

    /// The number of committees at every slot of the epoch, given an active validator count.
    pub fn committees_per_slot<T: EthSpec>(active_validator_count: usize, spec: &ChainSpec) -> u64 {
        std::cmp::max(
            1,
            std::cmp::min(
                spec.max_committees_per_slot,
                active_validator_count / T::slots_per_epoch() as usize
                    / spec.target_committee_size,
            ),
        ) as u64
    }

    /// Returns `true` if the cache has been initialized at the supplied `epoch`.
    pub fn is_initialized_at(&self, epoch: Epoch) -> bool {
        self.initialized_epoch == Some(epoch)
    }

    pub fn initialized_epoch(&self) -> Option<Epoch> {
        self.initialized_epoch
    }

    /// The number of active validators in the initialized epoch.
    pub fn active_validator_count(&self) -> usize {
        self.shuffling.len()
    }

    /// The shuffled list of active validator indices.
    pub fn shuffling(&self) -> &[usize] {
        &self.shuffling
    }

    pub fn get_committees_per_slot(&self) -> u64 {
        self.committees_per_slot
    }

    /// The total number of committees across all slots of the initialized epoch.
    pub fn epoch_committee_count(&self) -> usize {
        self.committees_per_slot as usize * self.slots_per_epoch as usize
    }

    /// Get the Beacon committee for the given `slot` and `index`.
    ///
    /// Returns `None` if the cache is uninitialized or the inputs are out of range.
    pub fn get_beacon_committee(&self, slot: Slot, index: CommitteeIndex) -> Option<BeaconCommittee> {
        let initialized_epoch = self.initialized_epoch?;
        if slot.epoch(self.slots_per_epoch) != initialized_epoch
            || index >= self.committees_per_slot
        {
            return None;
        }

        let committee_index =
            (slot.as_u64() % self.slots_per_epoch) * self.committees_per_slot + index;
        let committee = self.compute_committee(committee_index as usize)?;

        Some(BeaconCommittee {
            slot,
            index,
            committee,
        })
    }

    /// Get all the Beacon committees at a given `slot`.
    pub fn get_beacon_committees_at_slot(&self, slot: Slot) -> Result<Vec<BeaconCommittee>, Error> {
        (0..self.committees_per_slot)
            .map(|index| {
                self.get_beacon_committee(slot, index)
                    .ok_or(Error::NoCommittee { slot, index })
            })
            .collect()
    }

    /// Returns the duty of `validator_index` in the initialized epoch, if it is active.
    pub fn get_attestation_duties(&self, validator_index: usize) -> Option<AttestationDuty> {
        let position = (*self.shuffling_positions.get(validator_index)?)?;

        (0..self.epoch_committee_count()).find_map(|committee_index| {
            let range = self.compute_committee_range(committee_index)?;
            if range.contains(&position) {
                let slot = Slot::new(
                    self.initialized_epoch?.start_slot(self.slots_per_epoch).as_u64()
                        + committee_index as u64 / self.committees_per_slot,
                );
                let index = committee_index as u64 % self.committees_per_slot;
                Some(AttestationDuty {
                    slot,
                    index,
                    committee_position: position - range.start,
                    committee_len: range.len(),
                })
            } else {
                None
            }
        })
    }

    fn compute_committee(&self, index: usize) -> Option<&[usize]> {
        self.shuffling.get(self.compute_committee_range(index)?)
    }

    /// Slices are contiguous and near-equal in size; committee `i` of `count` over a shuffling of
    /// length `n` covers `[n * i / count, n * (i + 1) / count)`.
    fn compute_committee_range(&self, index: usize) -> Option<Range<usize>> {
        let count = self.epoch_committee_count();
        if count == 0 || index >= count {
            return None;
        }

        let num_validators = self.shuffling.len();
        let start = (num_validators * index) / count;
        let end = (num_validators * (index + 1)) / count;

        Some(start..end)
    }
}
