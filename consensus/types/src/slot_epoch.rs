//! The `Slot` and `Epoch` newtypes.
//!
//! Both wrap a `u64` and serialize identically to one. `std::ops` arithmetic saturates at the
//! numeric bounds; state-transition code that must surface overflow uses the checked `safe_*`
//! methods instead.

use serde_derive::{Deserialize, Serialize};

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(#[serde(with = "serde_utils::quoted_u64")] u64);

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(#[serde(with = "serde_utils::quoted_u64")] u64);

impl_u64_codec!(Slot);
impl_u64_codec!(Epoch);
impl_u64_math!(Slot);
impl_u64_math!(Epoch);

impl crate::SignedRoot for Epoch {}

impl Slot {
    /// Returns the epoch this slot belongs to.
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }

    pub fn is_epoch_boundary(self, slots_per_epoch: u64) -> bool {
        self.0 % slots_per_epoch == 0
    }
}

impl Epoch {
    /// The first slot of this epoch.
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    /// The last slot of this epoch.
    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::new(
            self.0
                .saturating_add(1)
                .saturating_mul(slots_per_epoch)
                .saturating_sub(1),
        )
    }

    /// Iterate over every slot in this epoch.
    pub fn slot_iter(self, slots_per_epoch: u64) -> impl Iterator<Item = Slot> {
        let start = self.start_slot(slots_per_epoch).as_u64();
        (start..start.saturating_add(slots_per_epoch)).map(Slot::new)
    }

    /// The sync committee period this epoch falls in.
    pub fn sync_committee_period(self, epochs_per_period: u64) -> u64 {
        self.0 / epochs_per_period
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

impl std::fmt::Debug for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Epoch({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_epoch_relationship() {
        assert_eq!(Slot::new(0).epoch(32), Epoch::new(0));
        assert_eq!(Slot::new(31).epoch(32), Epoch::new(0));
        assert_eq!(Slot::new(32).epoch(32), Epoch::new(1));

        assert_eq!(Epoch::new(2).start_slot(32), Slot::new(64));
        assert_eq!(Epoch::new(2).end_slot(32), Slot::new(95));
    }

    #[test]
    fn saturating_ops() {
        assert_eq!(Slot::new(0) - 1u64, Slot::new(0));
        assert_eq!(Epoch::new(u64::MAX) + 1u64, Epoch::new(u64::MAX));
    }

    #[test]
    fn checked_ops_overflow() {
        assert!(Slot::new(0).safe_sub(1u64).is_err());
        assert!(Epoch::new(u64::MAX).safe_add(1u64).is_err());
    }

    #[test]
    fn slot_iter_covers_epoch() {
        let slots: Vec<_> = Epoch::new(1).slot_iter(8).collect();
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0], Slot::new(8));
        assert_eq!(slots[7], Slot::new(15));
    }

    #[test]
    fn ssz_round_trip() {
        use ssz::{Decode, Encode};
        let slot = Slot::new(7_654_321);
        let bytes = slot.as_ssz_bytes();
        assert_eq!(bytes, 7_654_321u64.as_ssz_bytes());
        assert_eq!(Slot::from_ssz_bytes(&bytes).unwrap(), slot);
    }
}
