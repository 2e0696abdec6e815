//! End-to-end tests of the orchestrator: block import, attestation flow, reorgs, bad-block
//! quarantine and the execution-engine boundary.

use beacon_chain::test_utils::{
    generate_deterministic_keypairs, interop_genesis_state, BeaconChainHarness,
};
use beacon_chain::{
    BlockError, ChainEvent, ChainObserver, EngineError, PayloadStatus,
};
use parking_lot::Mutex;
use state_processing::complete_state_advance;
use std::sync::Arc;
use types::{Epoch, EthSpec, Hash256, MainnetEthSpec, MinimalEthSpec, ParticipationFlags, Slot};

type E = MinimalEthSpec;

const VALIDATOR_COUNT: usize = 16;

/// Captures every event the chain publishes.
#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<ChainEvent>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<ChainEvent> {
        self.events.lock().clone()
    }
}

impl ChainObserver<E> for RecordingObserver {
    fn on_head_changed(&self, new_head: Hash256, old_head: Hash256, reorg_depth: u64) {
        self.events.lock().push(ChainEvent::HeadChanged {
            new_head,
            old_head,
            reorg_depth,
        });
    }

    fn on_checkpoint_justified(&self, checkpoint: types::Checkpoint) {
        self.events
            .lock()
            .push(ChainEvent::CheckpointJustified(checkpoint));
    }

    fn on_checkpoint_finalized(&self, checkpoint: types::Checkpoint) {
        self.events
            .lock()
            .push(ChainEvent::CheckpointFinalized(checkpoint));
    }

    fn on_block_processed(&self, block_root: Hash256, slot: Slot) {
        self.events
            .lock()
            .push(ChainEvent::BlockProcessed { block_root, slot });
    }

    fn on_block_rejected(&self, block_root: Hash256) {
        self.events
            .lock()
            .push(ChainEvent::BlockRejected { block_root });
    }
}

/// Scenario: from a genesis state at slot 0 with 16 validators at full effective balance,
/// advance one full epoch with no blocks.
#[test]
fn empty_genesis_transition() {
    type M = MainnetEthSpec;
    let spec = M::default_spec();
    let keypairs = generate_deterministic_keypairs(16);
    let mut state = interop_genesis_state::<M>(&keypairs, 0, &spec);

    let pre_balances: Vec<u64> = state.balances.iter().copied().collect();
    let genesis_mix = *state.get_randao_mix(Epoch::new(0)).unwrap();

    complete_state_advance(&mut state, None, Slot::new(32), &spec).unwrap();

    assert_eq!(state.slot, Slot::new(32));

    // No rewards nor penalties apply in the genesis epoch.
    let post_balances: Vec<u64> = state.balances.iter().copied().collect();
    assert_eq!(pre_balances, post_balances);

    // The randao accumulator rotated forward into the new epoch.
    assert_eq!(*state.get_randao_mix(Epoch::new(1)).unwrap(), genesis_mix);

    // Participation was rotated: the current vector is all zeroes.
    assert!(state
        .current_epoch_participation
        .iter()
        .all(|flags| *flags == ParticipationFlags::default()));

    assert_eq!(state.current_justified_checkpoint.epoch, Epoch::new(0));
}

/// Scenario: a valid block at slot 1 atop genesis is accepted and becomes the head.
#[test]
fn first_block_accepted() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    let genesis_root = harness.genesis_block_root();

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.make_block(Slot::new(1));
    let block_root = block.canonical_root();

    let outcome = harness.chain.receive_block(block);
    assert!(outcome.is_accepted(), "{:?}", outcome);

    assert_eq!(harness.chain.head_root(), block_root);

    let head = harness.chain.head_snapshot();
    assert_eq!(head.beacon_state.slot, Slot::new(1));
    assert_eq!(head.beacon_state.latest_block_header.parent_root, genesis_root);

    // No justification changes this early.
    assert_eq!(
        harness.chain.justified_checkpoint().epoch,
        Epoch::new(0)
    );
}

/// A duplicate of an already-imported block is ignored, not rejected.
#[test]
fn duplicate_block_is_ignored() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.make_block(Slot::new(1));

    assert!(harness.chain.receive_block(block.clone()).is_accepted());

    match harness.chain.receive_block(block) {
        beacon_chain::ReceiveOutcome::Ignored(BlockError::DuplicateBlock(_)) => {}
        other => panic!("expected duplicate to be ignored, got {:?}", other),
    }
}

/// A block from a slot the clock has not reached is ignored.
#[test]
fn future_block_is_ignored() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.make_block(Slot::new(1));

    // Roll a fresh harness that is still at slot 0 and offer it the slot-1 block.
    let behind = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    match behind.chain.receive_block(block) {
        beacon_chain::ReceiveOutcome::Ignored(BlockError::FutureSlot { .. }) => {}
        other => panic!("expected future block to be ignored, got {:?}", other),
    }
}

/// A block referencing an unknown parent is ignored and may be retried.
#[test]
fn orphan_block_is_ignored() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(2)).unwrap();
    let mut block = harness.make_block(Slot::new(2)).message;
    block.parent_root = Hash256::repeat_byte(0xab);
    let block = harness.sign_block(block);

    match harness.chain.receive_block(block) {
        beacon_chain::ReceiveOutcome::Ignored(BlockError::ParentUnknown(_)) => {}
        other => panic!("expected orphan to be ignored, got {:?}", other),
    }
}

/// An invalid proposer signature rejects the block.
#[test]
fn bad_proposer_signature_is_rejected() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let mut block = harness.make_block(Slot::new(1));
    // Swap in the infinity signature.
    block.signature = types::SignatureBytes::empty();

    match harness.chain.receive_block(block) {
        beacon_chain::ReceiveOutcome::Rejected(BlockError::ProposalSignatureInvalid) => {}
        other => panic!("expected signature rejection, got {:?}", other),
    }
}

/// Scenario: a block whose claimed state root is one bit off is rejected, quarantined, and its
/// descendants are rejected without execution. Siblings are unaffected.
#[test]
fn bad_block_quarantine() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    let observer = Arc::new(RecordingObserver::default());
    harness.chain.register_observer(observer.clone());

    harness.chain.on_slot(Slot::new(1)).unwrap();

    // Craft a block whose state root has one flipped bit, re-signed so only the root is wrong.
    let mut message = harness.make_block(Slot::new(1)).message;
    let mut root_bytes = message.state_root.to_fixed_bytes();
    root_bytes[31] ^= 1;
    message.state_root = Hash256::from(root_bytes);
    let bad_block = harness.sign_block(message);
    let bad_root = bad_block.canonical_root();

    match harness.chain.receive_block(bad_block) {
        beacon_chain::ReceiveOutcome::Rejected(BlockError::StateRootMismatch { .. }) => {}
        other => panic!("expected state root mismatch, got {:?}", other),
    }
    assert!(harness.chain.is_known_bad_block(&bad_root));
    assert!(observer
        .events()
        .contains(&ChainEvent::BlockRejected { block_root: bad_root }));

    // A child of the quarantined block is rejected without execution.
    harness.chain.on_slot(Slot::new(2)).unwrap();
    let mut child = harness.make_block(Slot::new(2)).message;
    child.parent_root = bad_root;
    let child = harness.sign_block(child);

    match harness.chain.receive_block(child) {
        beacon_chain::ReceiveOutcome::Rejected(BlockError::ParentKnownInvalid(root)) => {
            assert_eq!(root, bad_root)
        }
        other => panic!("expected quarantined descendant rejection, got {:?}", other),
    }

    // A sibling sharing the (valid) parent is judged on its own merits.
    let sibling = harness.make_block(Slot::new(2));
    assert!(harness.chain.receive_block(sibling).is_accepted());
}

/// Scenario: a competing block with more votes arriving one slot later triggers a depth-1 reorg
/// and a `HeadChanged` event.
#[test]
fn reorg_to_heavier_sibling() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    // Build an honest chain through slot 9.
    harness.extend_to_slot(Slot::new(9));

    let observer = Arc::new(RecordingObserver::default());
    harness.chain.register_observer(observer.clone());

    // Craft two competing blocks for slot 10 atop the same parent before either is imported.
    let block_h = harness.make_block(Slot::new(10));
    let root_h = block_h.canonical_root();
    let block_h_prime = harness.make_block_with_modifier(Slot::new(10), |block| {
        block.body.graffiti = types::Graffiti::from([7u8; 32]);
    });
    let root_h_prime = block_h_prime.canonical_root();
    assert_ne!(root_h, root_h_prime);

    // Block H arrives and becomes head, unattested.
    harness.chain.on_slot(Slot::new(10)).unwrap();
    assert!(harness.chain.receive_block(block_h).is_accepted());
    assert_eq!(harness.chain.head_root(), root_h);

    // The sibling H' arrives one slot later...
    harness.chain.on_slot(Slot::new(11)).unwrap();
    assert!(harness.chain.receive_block(block_h_prime).is_accepted());

    // ...and the whole committee of slot 10 votes for it.
    let head_state = harness.chain.head_snapshot().beacon_state.clone();
    let attestations = harness.make_attestations(&head_state, root_h_prime, Slot::new(10));
    for attestation in attestations {
        assert!(harness.chain.receive_attestation(attestation).is_accepted());
    }

    assert_eq!(harness.chain.head_root(), root_h_prime);
    assert!(
        harness.chain.block_weight(&root_h_prime).unwrap()
            > harness.chain.block_weight(&root_h).unwrap()
    );

    let saw_reorg = observer.events().iter().any(|event| {
        matches!(
            event,
            ChainEvent::HeadChanged {
                new_head,
                old_head,
                reorg_depth: 1,
            } if *new_head == root_h_prime && *old_head == root_h
        )
    });
    assert!(saw_reorg, "events: {:?}", observer.events());
}

/// An unreachable execution engine leaves the block optimistic rather than rejecting it.
#[test]
fn unavailable_engine_keeps_block_optimistic() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    harness
        .mock_engine
        .set_status(Err(EngineError::Unavailable));

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.make_block(Slot::new(1));
    let block_root = block.canonical_root();

    assert!(harness.chain.receive_block(block).is_accepted());
    assert!(harness
        .chain
        .fork_choice_block(&block_root)
        .unwrap()
        .execution_status
        .is_optimistic());
}

/// An engine-rejected payload rejects the block and quarantines its root.
#[test]
fn invalid_payload_rejects_block() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    harness
        .mock_engine
        .set_status(Ok(PayloadStatus::Invalid));

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.make_block(Slot::new(1));
    let block_root = block.canonical_root();

    match harness.chain.receive_block(block) {
        beacon_chain::ReceiveOutcome::Rejected(BlockError::ExecutionPayloadInvalid) => {}
        other => panic!("expected payload rejection, got {:?}", other),
    }
    assert!(harness.chain.is_known_bad_block(&block_root));
}

/// The engine is told about head and finalized updates.
#[test]
fn engine_receives_forkchoice_updates() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.make_block(Slot::new(1));
    assert!(harness.chain.receive_block(block).is_accepted());

    assert!(
        !harness.mock_engine.forkchoice_updates().is_empty(),
        "the engine should have seen at least one forkchoice update"
    );
}

/// An attestation with no aggregation bits set is rejected.
#[test]
fn empty_aggregation_bits_rejected() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    let head_root = harness.extend_to_slot(Slot::new(2));

    let head_state = harness.chain.head_snapshot().beacon_state.clone();
    let mut attestation = harness
        .make_attestations(&head_state, head_root, Slot::new(2))
        .remove(0);

    // Clear every bit.
    let len = attestation.aggregation_bits.len();
    for i in 0..len {
        attestation.aggregation_bits.set(i, false).unwrap();
    }

    match harness.chain.receive_attestation(attestation) {
        beacon_chain::ReceiveOutcome::Rejected(
            beacon_chain::AttestationError::EmptyAggregationBitfield,
        ) => {}
        other => panic!("expected empty-bitfield rejection, got {:?}", other),
    }
}

/// An attestation for an unknown block is ignored, not rejected.
#[test]
fn attestation_for_unknown_block_is_ignored() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    let head_root = harness.extend_to_slot(Slot::new(2));

    let head_state = harness.chain.head_snapshot().beacon_state.clone();
    let mut attestation = harness
        .make_attestations(&head_state, head_root, Slot::new(2))
        .remove(0);
    attestation.data.beacon_block_root = Hash256::repeat_byte(0x42);

    match harness.chain.receive_attestation(attestation) {
        beacon_chain::ReceiveOutcome::Ignored(
            beacon_chain::AttestationError::UnknownHeadBlock { .. },
        ) => {}
        other => panic!("expected unknown-block ignore, got {:?}", other),
    }
}
