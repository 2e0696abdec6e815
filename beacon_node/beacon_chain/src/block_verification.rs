//! The block-import pipeline, expressed as owned records moving through phases:
//!
//! ```text
//! SignedBeaconBlock
//!       |  validate: structural checks, ancestry checks, proposer signature
//!       v
//! SignatureVerifiedBlock
//!       |  transition: slot advance + per-block processing + state-root check
//!       v
//! ExecutedBlock
//!       |  persist + publish (performed by the `BeaconChain`)
//!       v
//! canonical chain
//! ```
//!
//! A failure at any phase drops the record; nothing partial becomes visible to readers.

use crate::beacon_chain::BeaconChain;
use crate::errors::BeaconChainError;
use crate::execution_engine::{EngineError, PayloadStatus};
use fork_choice::ExecutionStatus;
use state_processing::{
    complete_state_advance, per_block_processing, BlockProcessingError, BlockSignatureStrategy,
    ConsensusContext,
};
use std::sync::Arc;
use store::KeyValueStore;
use types::{BeaconState, Domain, EthSpec, Hash256, SignedBeaconBlock, SignedRoot, Slot};

/// Reasons a block fails to import.
///
/// The split between "ignore" and "reject" (see `BlockError::is_rejection`) follows gossip
/// semantics: rejection implies the block can never become valid, ignoring implies we cannot
/// judge it yet.
#[derive(Debug)]
pub enum BlockError {
    /// The block has already been imported.
    DuplicateBlock(Hash256),
    /// The parent block is not known; the block may become valid once the parent arrives.
    ParentUnknown(Hash256),
    /// The block is from a slot the clock has not reached yet.
    FutureSlot {
        present_slot: Slot,
        block_slot: Slot,
    },
    /// The block conflicts with finality; at or before the finalized slot.
    WouldRevertFinalizedSlot {
        block_slot: Slot,
        finalized_slot: Slot,
    },
    /// The block does not descend from the finalized root.
    NotFinalizedDescendant { block_parent_root: Hash256 },
    /// The block descends from a block already marked invalid.
    ParentKnownInvalid(Hash256),
    /// This exact root was previously marked invalid.
    KnownInvalid(Hash256),
    /// The proposer's signature over the block is invalid.
    ProposalSignatureInvalid,
    /// The proposer index does not match the shuffle.
    IncorrectBlockProposer { block: u64, local: u64 },
    /// The state transition succeeded but the resulting root differs from the block's claim.
    StateRootMismatch { block: Hash256, local: Hash256 },
    /// The execution engine rejected the payload.
    ExecutionPayloadInvalid,
    /// A per-operation or other state-transition failure.
    PerBlockProcessingError(BlockProcessingError),
    /// Fork choice refused the block after execution.
    ForkChoice(String),
    /// An internal error; the block's validity remains unknown.
    BeaconChainError(Box<BeaconChainError>),
}

impl BlockError {
    /// `true` if the block is provably invalid and must be recorded as bad; `false` if it was
    /// merely ignored and may be retried later.
    pub fn is_rejection(&self) -> bool {
        match self {
            BlockError::DuplicateBlock(_)
            | BlockError::ParentUnknown(_)
            | BlockError::FutureSlot { .. }
            | BlockError::BeaconChainError(_) => false,
            BlockError::WouldRevertFinalizedSlot { .. }
            | BlockError::NotFinalizedDescendant { .. }
            | BlockError::ParentKnownInvalid(_)
            | BlockError::KnownInvalid(_)
            | BlockError::ProposalSignatureInvalid
            | BlockError::IncorrectBlockProposer { .. }
            | BlockError::StateRootMismatch { .. }
            | BlockError::ExecutionPayloadInvalid
            | BlockError::PerBlockProcessingError(_)
            | BlockError::ForkChoice(_) => true,
        }
    }
}

impl From<BeaconChainError> for BlockError {
    fn from(e: BeaconChainError) -> Self {
        BlockError::BeaconChainError(Box::new(e))
    }
}

impl From<BlockProcessingError> for BlockError {
    fn from(e: BlockProcessingError) -> Self {
        BlockError::PerBlockProcessingError(e)
    }
}

/// A block that has passed the validate phase: ancestry admissible, proposer signature correct.
///
/// Holds the pre-state it was validated against, to be consumed by the transition phase.
pub struct SignatureVerifiedBlock<E: EthSpec> {
    pub block: Arc<SignedBeaconBlock<E>>,
    pub block_root: Hash256,
    pub pre_state: BeaconState<E>,
    /// The root of `pre_state`, when it is known without hashing (i.e. the parent's claimed
    /// state root). `None` when the pre-state was already advanced past the parent slot.
    pub pre_state_root: Option<Hash256>,
}

/// A block that has passed the transition phase: carries its verified post-state.
pub struct ExecutedBlock<E: EthSpec> {
    pub block: Arc<SignedBeaconBlock<E>>,
    pub block_root: Hash256,
    pub post_state: BeaconState<E>,
    pub execution_status: ExecutionStatus,
}

impl<E: EthSpec> SignatureVerifiedBlock<E> {
    /// The validate phase.
    ///
    /// Performs every check that does not require executing the block: clock, finality,
    /// ancestry, bad-block quarantine and the proposer signature.
    pub fn new<KV: KeyValueStore<E>>(
        block: Arc<SignedBeaconBlock<E>>,
        block_root: Hash256,
        chain: &BeaconChain<E, KV>,
    ) -> Result<Self, BlockError> {
        let block_slot = block.slot();
        let present_slot = chain.current_slot();

        if block_slot > present_slot {
            return Err(BlockError::FutureSlot {
                present_slot,
                block_slot,
            });
        }

        if chain.is_known_bad_block(&block_root) {
            return Err(BlockError::KnownInvalid(block_root));
        }

        // Only direct descendants of a bad block are quarantined; siblings re-validate
        // independently.
        if chain.is_known_bad_block(&block.parent_root()) {
            return Err(BlockError::ParentKnownInvalid(block.parent_root()));
        }

        if chain.block_is_known(&block_root)? {
            return Err(BlockError::DuplicateBlock(block_root));
        }

        let finalized_slot = chain
            .finalized_checkpoint()
            .epoch
            .start_slot(E::slots_per_epoch());
        if block_slot <= finalized_slot {
            return Err(BlockError::WouldRevertFinalizedSlot {
                block_slot,
                finalized_slot,
            });
        }

        if !chain.block_is_known(&block.parent_root())? {
            return Err(BlockError::ParentUnknown(block.parent_root()));
        }

        // Fetch the pre-state; from cache, disk, or snapshot replay.
        let (pre_state, pre_state_root) = chain.state_for_block_import(&block)?;

        // Verify the proposer signature against the pre-state's registry. The registry can only
        // grow via deposits in blocks, so the proposer of a child block always exists in the
        // parent's state.
        let proposer = pre_state
            .get_validator(block.message.proposer_index as usize)
            .map_err(|_| BlockError::IncorrectBlockProposer {
                block: block.message.proposer_index,
                local: u64::MAX,
            })?;

        let domain = chain.spec.get_domain(
            block.message.epoch(),
            Domain::BeaconProposer,
            &pre_state.fork,
            pre_state.genesis_validators_root,
        );
        let message = block.message.signing_root(domain);

        let signature_valid = proposer
            .pubkey
            .decompress()
            .ok()
            .zip(block.signature.decompress().ok())
            .map_or(false, |(pubkey, signature)| {
                signature.verify(&pubkey, message)
            });

        if !signature_valid && chain.config.verify_signatures {
            return Err(BlockError::ProposalSignatureInvalid);
        }

        Ok(Self {
            block,
            block_root,
            pre_state,
            pre_state_root,
        })
    }

    /// The transition phase.
    ///
    /// Advances the pre-state to the block's slot, applies the block, verifies the claimed state
    /// root and obtains the execution engine's verdict for the payload.
    pub fn into_executed<KV: KeyValueStore<E>>(
        self,
        chain: &BeaconChain<E, KV>,
    ) -> Result<ExecutedBlock<E>, BlockError> {
        let Self {
            block,
            block_root,
            mut pre_state,
            pre_state_root,
        } = self;

        // Passing the known pre-state root avoids one full tree hash on the first advanced slot.
        complete_state_advance(&mut pre_state, pre_state_root, block.slot(), &chain.spec)
            .map_err(BeaconChainError::from)?;

        let strategy = if chain.config.verify_signatures {
            BlockSignatureStrategy::VerifyIndividual
        } else {
            BlockSignatureStrategy::NoVerification
        };

        let mut ctxt = ConsensusContext::new(block.slot()).set_current_block_root(block_root);
        per_block_processing(&mut pre_state, &block, strategy, &mut ctxt, &chain.spec)?;

        let mut post_state = pre_state;

        // The claimed root must match bit-for-bit; a mismatch quarantines the root.
        let local_state_root = post_state.canonical_root();
        if local_state_root != block.state_root() {
            return Err(BlockError::StateRootMismatch {
                block: block.state_root(),
                local: local_state_root,
            });
        }

        // Execution validity is delegated; an unreachable engine leaves the block optimistic.
        let payload = &block.message.body.execution_payload;
        let execution_status = match chain.execution_engine.notify_new_payload(payload) {
            Ok(PayloadStatus::Valid) => ExecutionStatus::Valid(payload.block_hash),
            Ok(PayloadStatus::Syncing) | Err(EngineError::Unavailable) => {
                ExecutionStatus::Optimistic(payload.block_hash)
            }
            Ok(PayloadStatus::Invalid) => return Err(BlockError::ExecutionPayloadInvalid),
        };

        Ok(ExecutedBlock {
            block,
            block_root,
            post_state,
            execution_status,
        })
    }
}
