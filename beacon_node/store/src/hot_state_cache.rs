use lru::LruCache;
use std::collections::HashMap;
use std::sync::Arc;
use types::{BeaconState, EthSpec, Hash256};

/// The maximum number of states stored before the least-recently-used is evicted.
pub const DEFAULT_STATE_CACHE_SIZE: usize = 32;

/// An LRU of recent states keyed by state root.
///
/// The head, justified and finalized states are pinned: they do not occupy LRU slots and are
/// never evicted, regardless of access patterns.
#[derive(Debug)]
pub struct HotStateCache<E: EthSpec> {
    cache: LruCache<Hash256, Arc<BeaconState<E>>>,
    pinned: HashMap<Hash256, Arc<BeaconState<E>>>,
}

impl<E: EthSpec> HotStateCache<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(capacity),
            pinned: HashMap::new(),
        }
    }

    /// Insert a state, evicting the least-recently-used unpinned state if at capacity.
    pub fn put(&mut self, state_root: Hash256, state: Arc<BeaconState<E>>) {
        if self.pinned.contains_key(&state_root) {
            return;
        }
        self.cache.put(state_root, state);
    }

    pub fn get(&mut self, state_root: &Hash256) -> Option<Arc<BeaconState<E>>> {
        if let Some(state) = self.pinned.get(state_root) {
            return Some(state.clone());
        }
        self.cache.get(state_root).cloned()
    }

    pub fn contains(&self, state_root: &Hash256) -> bool {
        self.pinned.contains_key(state_root) || self.cache.contains(state_root)
    }

    pub fn len(&self) -> usize {
        self.cache.len() + self.pinned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the pinned set.
    ///
    /// States pinned before but absent from `roots` fall back into the LRU; states in `roots`
    /// currently in the LRU move out of it, freeing their slots.
    pub fn update_pinned(&mut self, roots: &[Hash256]) {
        let old_pinned = std::mem::take(&mut self.pinned);

        for (root, state) in old_pinned {
            if roots.contains(&root) {
                self.pinned.insert(root, state);
            } else {
                self.cache.put(root, state);
            }
        }

        for root in roots {
            if !self.pinned.contains_key(root) {
                if let Some(state) = self.cache.pop(root) {
                    self.pinned.insert(*root, state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Eth1Data, MinimalEthSpec};

    type E = MinimalEthSpec;

    fn dummy_state() -> Arc<BeaconState<E>> {
        Arc::new(BeaconState::new(0, Eth1Data::default(), &E::default_spec()))
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = HotStateCache::<E>::new(2);
        let (a, b, c) = (
            Hash256::repeat_byte(1),
            Hash256::repeat_byte(2),
            Hash256::repeat_byte(3),
        );

        cache.put(a, dummy_state());
        cache.put(b, dummy_state());
        // Touch `a` so `b` becomes the eviction candidate.
        cache.get(&a);
        cache.put(c, dummy_state());

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn pinned_states_survive_eviction_pressure() {
        let mut cache = HotStateCache::<E>::new(1);
        let pinned_root = Hash256::repeat_byte(1);

        cache.put(pinned_root, dummy_state());
        cache.update_pinned(&[pinned_root]);

        // Flood the cache.
        for i in 2..16 {
            cache.put(Hash256::repeat_byte(i), dummy_state());
        }

        assert!(cache.contains(&pinned_root));
    }

    #[test]
    fn unpinning_returns_state_to_lru() {
        let mut cache = HotStateCache::<E>::new(4);
        let root = Hash256::repeat_byte(1);

        cache.put(root, dummy_state());
        cache.update_pinned(&[root]);
        cache.update_pinned(&[]);

        assert!(cache.contains(&root));
        assert_eq!(cache.len(), 1);
    }
}
