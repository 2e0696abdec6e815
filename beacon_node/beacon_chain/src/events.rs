//! The observer registry through which the orchestrator publishes chain events.
//!
//! Observers are plain capability objects invoked synchronously on the writer task, in
//! registration order. A slow observer blocks the chain; implementations are expected to hand
//! work off if they need to do anything heavy.

use parking_lot::RwLock;
use std::sync::Arc;
use types::{AttestationData, Checkpoint, EthSpec, Hash256, Slot};

/// A chain event, as delivered to `ChainObserver::on_event`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    HeadChanged {
        new_head: Hash256,
        old_head: Hash256,
        reorg_depth: u64,
    },
    CheckpointJustified(Checkpoint),
    CheckpointFinalized(Checkpoint),
    BlockProcessed {
        block_root: Hash256,
        slot: Slot,
    },
    AttestationProcessed {
        data: AttestationData,
    },
    BlockRejected {
        block_root: Hash256,
    },
}

/// The capabilities an observer may implement. All methods default to no-ops so observers only
/// write the hooks they care about.
pub trait ChainObserver<E: EthSpec>: Send + Sync {
    fn on_head_changed(&self, _new_head: Hash256, _old_head: Hash256, _reorg_depth: u64) {}

    fn on_checkpoint_justified(&self, _checkpoint: Checkpoint) {}

    fn on_checkpoint_finalized(&self, _checkpoint: Checkpoint) {}

    fn on_block_processed(&self, _block_root: Hash256, _slot: Slot) {}

    fn on_attestation_processed(&self, _data: &AttestationData) {}

    fn on_block_rejected(&self, _block_root: Hash256) {}
}

/// Holds the registered observers and fans events out to them.
pub struct ObserverRegistry<E: EthSpec> {
    observers: RwLock<Vec<Arc<dyn ChainObserver<E>>>>,
}

impl<E: EthSpec> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self {
            observers: RwLock::new(vec![]),
        }
    }
}

impl<E: EthSpec> ObserverRegistry<E> {
    pub fn register(&self, observer: Arc<dyn ChainObserver<E>>) {
        self.observers.write().push(observer);
    }

    pub fn num_observers(&self) -> usize {
        self.observers.read().len()
    }

    /// Deliver `event` to every observer, synchronously and in registration order.
    pub fn publish(&self, event: ChainEvent) {
        for observer in self.observers.read().iter() {
            match &event {
                ChainEvent::HeadChanged {
                    new_head,
                    old_head,
                    reorg_depth,
                } => observer.on_head_changed(*new_head, *old_head, *reorg_depth),
                ChainEvent::CheckpointJustified(checkpoint) => {
                    observer.on_checkpoint_justified(*checkpoint)
                }
                ChainEvent::CheckpointFinalized(checkpoint) => {
                    observer.on_checkpoint_finalized(*checkpoint)
                }
                ChainEvent::BlockProcessed { block_root, slot } => {
                    observer.on_block_processed(*block_root, *slot)
                }
                ChainEvent::AttestationProcessed { data } => {
                    observer.on_attestation_processed(data)
                }
                ChainEvent::BlockRejected { block_root } => {
                    observer.on_block_rejected(*block_root)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use types::MinimalEthSpec;

    type E = MinimalEthSpec;

    #[derive(Default)]
    struct RecordingObserver {
        heads: Mutex<Vec<(Hash256, Hash256, u64)>>,
    }

    impl ChainObserver<E> for RecordingObserver {
        fn on_head_changed(&self, new_head: Hash256, old_head: Hash256, reorg_depth: u64) {
            self.heads.lock().push((new_head, old_head, reorg_depth));
        }
    }

    #[test]
    fn events_fan_out_to_registered_observers() {
        let registry = ObserverRegistry::<E>::default();
        let observer = Arc::new(RecordingObserver::default());
        registry.register(observer.clone());

        registry.publish(ChainEvent::HeadChanged {
            new_head: Hash256::repeat_byte(1),
            old_head: Hash256::repeat_byte(2),
            reorg_depth: 3,
        });
        // An event type without a written hook is silently dropped.
        registry.publish(ChainEvent::BlockRejected {
            block_root: Hash256::zero(),
        });

        let heads = observer.heads.lock();
        assert_eq!(
            *heads,
            vec![(Hash256::repeat_byte(1), Hash256::repeat_byte(2), 3)]
        );
    }
}
