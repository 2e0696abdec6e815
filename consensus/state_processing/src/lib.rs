//! The beacon-chain state-transition function and its sub-transitions.
//!
//! The top-level contract is `per_slot_processing` + `per_block_processing`: given identical
//! inputs, any conforming implementation must produce an identical post-state root.

#[macro_use]
mod macros;

pub mod block_replayer;
pub mod common;
pub mod consensus_context;
pub mod per_block_processing;
pub mod per_epoch_processing;
pub mod per_slot_processing;
pub mod state_advance;

pub use block_replayer::{BlockReplayError, BlockReplayer, StateRootStrategy};
pub use consensus_context::{ConsensusContext, ContextError};
pub use per_block_processing::{
    errors::BlockProcessingError, per_block_processing, BlockSignatureStrategy, VerifySignatures,
};
pub use per_epoch_processing::{
    compute_unrealized_checkpoints, errors::EpochProcessingError, process_epoch,
    EpochProcessingSummary,
};
pub use per_slot_processing::{per_slot_processing, Error as SlotProcessingError};
pub use state_advance::complete_state_advance;
