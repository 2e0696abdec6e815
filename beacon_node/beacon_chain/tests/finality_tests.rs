//! Justification and finalization over multi-epoch chains with full participation, plus the
//! replay-from-snapshot equivalence the store guarantees.

use beacon_chain::test_utils::BeaconChainHarness;
use state_processing::{BlockReplayError, BlockReplayer};
use types::{Epoch, EthSpec, MinimalEthSpec, Slot};

type E = MinimalEthSpec;

const VALIDATOR_COUNT: usize = 16;

fn slots_per_epoch() -> u64 {
    E::slots_per_epoch()
}

/// With full participation, the first justification lands once two epochs of attestations are
/// on-chain: entering epoch 3, both epoch 1 and epoch 2 are justified.
#[test]
fn full_participation_justifies() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    // Through the end of epoch 1: justification maths are skipped near genesis.
    harness.extend_to_slot(Slot::new(2 * slots_per_epoch() - 1));
    assert_eq!(harness.chain.justified_checkpoint().epoch, Epoch::new(0));

    // Crossing into epoch 3 runs epoch-2 processing: epochs 1 and 2 both justify.
    harness.extend_to_slot(Slot::new(3 * slots_per_epoch()));
    assert!(
        harness.chain.justified_checkpoint().epoch >= Epoch::new(1),
        "first justification should have happened"
    );
    assert_eq!(harness.chain.justified_checkpoint().epoch, Epoch::new(2));

    // Nothing finalizes this early.
    assert_eq!(harness.chain.finalized_checkpoint().epoch, Epoch::new(0));
}

/// Continuing with full participation through epoch 3 finalizes epoch 2.
#[test]
fn full_participation_finalizes() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);

    harness.extend_to_slot(Slot::new(4 * slots_per_epoch()));

    assert_eq!(harness.chain.justified_checkpoint().epoch, Epoch::new(3));
    assert_eq!(harness.chain.finalized_checkpoint().epoch, Epoch::new(2));

    // Finalized checkpoints never move backwards; extend further and re-check monotonicity.
    let finalized_before = harness.chain.finalized_checkpoint().epoch;
    harness.extend_to_slot(Slot::new(5 * slots_per_epoch()));
    assert!(harness.chain.finalized_checkpoint().epoch >= finalized_before);
}

/// The finalized `slot -> root` archive matches the canonical chain.
#[test]
fn finalized_chain_is_archived() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    harness.extend_to_slot(Slot::new(4 * slots_per_epoch()));

    let finalized = harness.chain.finalized_checkpoint();
    assert_eq!(finalized.epoch, Epoch::new(2));

    let finalized_slot = finalized.epoch.start_slot(slots_per_epoch());
    let archived_root = harness
        .chain
        .store
        .get_archive_entry(finalized_slot)
        .unwrap()
        .expect("the finalized slot should be archived");
    assert_eq!(archived_root, finalized.root);
}

/// Replaying every block from genesis reproduces the head state root bit-for-bit.
#[test]
fn replay_from_genesis_reproduces_head() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    let end_slot = Slot::new(2 * slots_per_epoch());
    harness.extend_to_slot(end_slot);

    let head = harness.chain.head_snapshot();

    // Collect the canonical blocks, genesis upwards, by walking parent roots.
    let mut blocks = vec![];
    let mut root = head.beacon_block_root;
    while let Some(block) = harness.chain.get_stored_block(&root).unwrap() {
        let parent = block.parent_root();
        let is_genesis = block.slot() == Slot::new(0);
        blocks.push(block);
        if is_genesis {
            break;
        }
        root = parent;
    }
    blocks.reverse();

    let genesis_state_root = blocks[0].state_root();
    let genesis_state = harness
        .chain
        .store
        .get_state(&genesis_state_root)
        .unwrap()
        .expect("genesis state is stored");

    let spec = harness.spec.clone();
    let replayed = BlockReplayer::<E, BlockReplayError>::new(genesis_state, &spec)
        .no_state_root_iter()
        .apply_blocks(blocks[1..].to_vec())
        .expect("replay succeeds")
        .into_state();

    assert_eq!(replayed.canonical_root(), head.beacon_state_root());
    assert_eq!(replayed.slot, head.beacon_state.slot);
}

/// Re-applying a block to its own post-state must fail; the transition is not idempotent.
#[test]
fn reapplying_a_block_fails() {
    use state_processing::{
        per_block_processing, BlockProcessingError, BlockSignatureStrategy, ConsensusContext,
    };
    use state_processing::per_block_processing::errors::HeaderInvalid;

    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    harness.chain.on_slot(Slot::new(1)).unwrap();
    let block = harness.make_block(Slot::new(1));
    assert!(harness.chain.receive_block(block.clone()).is_accepted());

    let head = harness.chain.head_snapshot();
    let mut post_state = (*head.beacon_state).clone();

    let mut ctxt = ConsensusContext::new(block.slot());
    let result = per_block_processing(
        &mut post_state,
        &block,
        BlockSignatureStrategy::NoVerification,
        &mut ctxt,
        &harness.spec,
    );

    assert!(
        matches!(
            result,
            Err(BlockProcessingError::HeaderInvalid {
                reason: HeaderInvalid::OlderThanLatestBlockHeader { .. }
            })
        ),
        "got {:?}",
        result
    );
}

/// A block at exactly the finalized slot is rejected; the canonical block one slot later was
/// already accepted as a finalized-descendant.
#[test]
fn finalized_slot_boundary() {
    let harness = BeaconChainHarness::<E>::new(VALIDATOR_COUNT);
    harness.extend_to_slot(Slot::new(4 * slots_per_epoch()));

    let finalized = harness.chain.finalized_checkpoint();
    let finalized_slot = finalized.epoch.start_slot(slots_per_epoch());

    // Craft a block targeting the finalized slot itself.
    let mut message = harness.make_block(harness.chain.current_slot() + 1u64).message;
    message.slot = finalized_slot;
    let block = harness.sign_block(message);

    match harness.chain.receive_block(block) {
        beacon_chain::ReceiveOutcome::Rejected(
            beacon_chain::BlockError::WouldRevertFinalizedSlot { .. },
        ) => {}
        other => panic!("expected finality rejection, got {:?}", other),
    }

    // The canonical block at `finalized_slot + 1` descends from the finalized block and was
    // accepted: find it by walking the head's ancestry.
    let mut root = harness.chain.head_root();
    let mut next_root = None;
    while let Some(block) = harness.chain.get_stored_block(&root).unwrap() {
        if block.slot() == finalized_slot + 1u64 {
            assert_eq!(block.parent_root(), finalized.root);
            next_root = Some(root);
            break;
        }
        root = block.parent_root();
    }
    let next_root = next_root.expect("a block exists at the slot after finalization");
    assert!(harness.chain.block_is_known(&next_root).unwrap());
}
