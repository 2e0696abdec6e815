use std::sync::Arc;
use types::{BeaconState, EthSpec, Hash256, SignedBeaconBlock};

/// Represents some block and its associated state. Generally, this will be used for tracking the
/// head, justified head and finalized head.
#[derive(Clone, Debug)]
pub struct BeaconSnapshot<E: EthSpec> {
    pub beacon_block: Arc<SignedBeaconBlock<E>>,
    pub beacon_block_root: Hash256,
    pub beacon_state: Arc<BeaconState<E>>,
}

impl<E: EthSpec> BeaconSnapshot<E> {
    /// Create a new checkpoint.
    pub fn new(
        beacon_block: Arc<SignedBeaconBlock<E>>,
        beacon_block_root: Hash256,
        beacon_state: Arc<BeaconState<E>>,
    ) -> Self {
        Self {
            beacon_block,
            beacon_block_root,
            beacon_state,
        }
    }

    /// Returns the state root from `self.beacon_block`.
    pub fn beacon_state_root(&self) -> Hash256 {
        self.beacon_block.state_root()
    }
}
