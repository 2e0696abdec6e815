use std::collections::BTreeSet;
use std::fmt::Debug;
use types::{BeaconBlock, BeaconState, Checkpoint, EthSpec, Hash256, Slot};

/// Approximates the `Store` in "Ethereum 2.0 Phase 0 -- Beacon Chain Fork Choice":
///
/// ## Detail
///
/// This is only an approximation for two reasons:
///
/// - The actual block DAG in `ProtoArray`.
/// - `time` is represented using `Slot` instead of UNIX epoch `u64`.
///
/// The clients implementing this trait should ensure that all the conditions in the consensus
/// fork-choice specification's `Store` are maintained.
pub trait ForkChoiceStore<T: EthSpec>: Sized {
    type Error: Debug;

    /// Returns the last value passed to `Self::set_current_slot`.
    fn get_current_slot(&self) -> Slot;

    /// Set the value to be returned by `Self::get_current_slot`.
    ///
    /// ## Notes
    ///
    /// This should only ever be called from within `ForkChoice::on_tick`.
    fn set_current_slot(&mut self, slot: Slot);

    /// Called whenever `ForkChoice::on_block` has verified a block. Allows the implementer to
    /// performing caching or other housekeeping duties.
    fn on_verified_block(
        &mut self,
        block: &BeaconBlock<T>,
        block_root: Hash256,
        state: &BeaconState<T>,
    ) -> Result<(), Self::Error>;

    /// Returns the `justified_checkpoint`.
    fn justified_checkpoint(&self) -> &Checkpoint;

    /// Returns balances from the `state` identified by `justified_checkpoint.root`.
    fn justified_balances(&self) -> &[u64];

    /// Returns the `finalized_checkpoint`.
    fn finalized_checkpoint(&self) -> &Checkpoint;

    /// Returns the `unrealized_justified_checkpoint`.
    fn unrealized_justified_checkpoint(&self) -> &Checkpoint;

    /// Returns the `unrealized_finalized_checkpoint`.
    fn unrealized_finalized_checkpoint(&self) -> &Checkpoint;

    /// Sets `finalized_checkpoint`.
    fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint);

    /// Sets the `justified_checkpoint`.
    ///
    /// Implementers must also update the justified balances to those of the checkpoint's state.
    fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint) -> Result<(), Self::Error>;

    /// Sets the `unrealized_justified_checkpoint`.
    fn set_unrealized_justified_checkpoint(&mut self, checkpoint: Checkpoint);

    /// Sets the `unrealized_finalized_checkpoint`.
    fn set_unrealized_finalized_checkpoint(&mut self, checkpoint: Checkpoint);

    /// Returns the set of validators the store knows to have equivocated.
    fn equivocating_indices(&self) -> &BTreeSet<u64>;

    /// Adds to the set of validators the store knows to have equivocated.
    fn extend_equivocating_indices(&mut self, indices: impl IntoIterator<Item = u64>);
}
