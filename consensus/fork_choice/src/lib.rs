mod fork_choice;
mod fork_choice_store;

pub use crate::fork_choice::{
    AttestationFromBlock, Error, ForkChoice, InvalidAttestation, InvalidBlock,
    PersistedForkChoice, QueuedAttestation,
};
pub use fork_choice_store::ForkChoiceStore;
pub use proto_array::{Block as ProtoBlock, ExecutionStatus};
