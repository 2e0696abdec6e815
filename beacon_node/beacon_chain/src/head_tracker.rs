use parking_lot::RwLock;
use ssz_derive::{Decode, Encode};
use std::collections::HashMap;
use types::{EthSpec, Hash256, SignedBeaconBlock, Slot};

#[derive(Debug, PartialEq)]
pub enum Error {
    MismatchingLengths { roots_len: usize, slots_len: usize },
}

/// Maintains a list of `BeaconChain` head block roots and slots.
///
/// Each time a new block is imported, it should be applied to the `Self::register_block`
/// function. In order for this struct to be effective, every single block that is imported must
/// be registered here.
#[derive(Default, Debug)]
pub struct HeadTracker(RwLock<HashMap<Hash256, Slot>>);

impl HeadTracker {
    /// Register a block with `Self`, so it may or may not be included in a `Self::heads` call.
    ///
    /// This function assumes that no block is imported without its parent having already been
    /// imported. It cannot detect an error if this is not the case, it is the responsibility of
    /// the upstream user.
    pub fn register_block<E: EthSpec>(&self, block_root: Hash256, block: &SignedBeaconBlock<E>) {
        let mut map = self.0.write();
        map.remove(&block.parent_root());
        map.insert(block_root, block.slot());
    }

    /// Remove any heads at or below `slot` that are not the given `canonical_root`.
    ///
    /// Called on finalization: branches that do not descend from the finalized block can never
    /// become canonical again.
    pub fn prune_to(&self, canonical_root: Hash256, slot: Slot) {
        self.0
            .write()
            .retain(|root, head_slot| *root == canonical_root || *head_slot > slot);
    }

    pub fn contains_head(&self, block_root: Hash256) -> bool {
        self.0.read().contains_key(&block_root)
    }

    /// Returns the list of heads in the chain.
    pub fn heads(&self) -> Vec<(Hash256, Slot)> {
        self.0
            .read()
            .iter()
            .map(|(root, slot)| (*root, *slot))
            .collect()
    }

    /// Returns a `SszHeadTracker`, which contains all necessary information to restore the state
    /// of `Self` at some later point.
    pub fn to_ssz_container(&self) -> SszHeadTracker {
        let (roots, slots) = self
            .0
            .read()
            .iter()
            .map(|(hash, slot)| (*hash, *slot))
            .unzip();

        SszHeadTracker { roots, slots }
    }

    /// Creates a new `Self` from the given `SszHeadTracker`, restoring `Self` to the same state
    /// of the `Self` that created the `SszHeadTracker`.
    pub fn from_ssz_container(ssz_container: &SszHeadTracker) -> Result<Self, Error> {
        let roots_len = ssz_container.roots.len();
        let slots_len = ssz_container.slots.len();

        if roots_len != slots_len {
            Err(Error::MismatchingLengths {
                roots_len,
                slots_len,
            })
        } else {
            let map = ssz_container
                .roots
                .iter()
                .zip(ssz_container.slots.iter())
                .map(|(root, slot)| (*root, *slot))
                .collect();

            Ok(Self(RwLock::new(map)))
        }
    }
}

impl PartialEq<HeadTracker> for HeadTracker {
    fn eq(&self, other: &HeadTracker) -> bool {
        *self.0.read() == *other.0.read()
    }
}

/// Helper struct that is used to encode/decode the state of the `HeadTracker` as SSZ bytes.
///
/// This is used when persisting the state of the `BeaconChain` to disk.
#[derive(Encode, Decode, Clone)]
pub struct SszHeadTracker {
    roots: Vec<Hash256>,
    slots: Vec<Slot>,
}

#[cfg(test)]
mod test {
    use super::*;
    use ssz::{Decode, Encode};
    use types::{BeaconBlock, MinimalEthSpec, SignatureBytes};

    type E = MinimalEthSpec;

    fn block_at(slot: u64, parent: Hash256) -> SignedBeaconBlock<E> {
        let spec = E::default_spec();
        let mut block = BeaconBlock::empty(&spec);
        block.slot = Slot::new(slot);
        block.parent_root = parent;
        SignedBeaconBlock {
            message: block,
            signature: SignatureBytes::empty(),
        }
    }

    #[test]
    fn chain_has_single_head() {
        let head_tracker = HeadTracker::default();

        let mut parent = Hash256::zero();
        for i in 0..16u64 {
            let block = block_at(i, parent);
            let block_root = Hash256::from_low_u64_be(i + 1);
            head_tracker.register_block(block_root, &block);
            parent = block_root;
        }

        assert_eq!(
            head_tracker.heads(),
            vec![(Hash256::from_low_u64_be(16), Slot::new(15))],
            "should only have one head"
        );
    }

    #[test]
    fn fork_has_two_heads() {
        let head_tracker = HeadTracker::default();
        let root = Hash256::from_low_u64_be(1);

        head_tracker.register_block(root, &block_at(0, Hash256::zero()));
        head_tracker.register_block(Hash256::from_low_u64_be(2), &block_at(1, root));
        head_tracker.register_block(Hash256::from_low_u64_be(3), &block_at(1, root));

        let mut heads = head_tracker.heads();
        heads.sort_unstable_by_key(|(root, _)| *root);
        assert_eq!(heads.len(), 2, "should have two heads");
    }

    #[test]
    fn prune_discards_stale_branches() {
        let head_tracker = HeadTracker::default();
        let canonical = Hash256::from_low_u64_be(1);

        head_tracker.register_block(canonical, &block_at(8, Hash256::zero()));
        head_tracker.register_block(Hash256::from_low_u64_be(2), &block_at(3, Hash256::zero()));

        head_tracker.prune_to(canonical, Slot::new(8));

        assert!(head_tracker.contains_head(canonical));
        assert!(!head_tracker.contains_head(Hash256::from_low_u64_be(2)));
    }

    #[test]
    fn ssz_round_trip() {
        let head_tracker = HeadTracker::default();
        for i in 0..16u64 {
            head_tracker
                .0
                .write()
                .insert(Hash256::from_low_u64_be(i), Slot::new(i));
        }

        let bytes = head_tracker.to_ssz_container().as_ssz_bytes();
        assert_eq!(
            HeadTracker::from_ssz_container(
                &SszHeadTracker::from_ssz_bytes(&bytes).expect("should decode")
            ),
            Ok(head_tracker),
            "should pass round trip"
        );
    }
}
