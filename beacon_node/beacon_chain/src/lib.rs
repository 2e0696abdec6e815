//! The beacon-chain orchestrator: the single writer that validates incoming blocks and
//! attestations, drives the state-transition engine, persists results, reruns fork choice and
//! notifies observers.

mod attestation_verification;
pub mod beacon_chain;
mod beacon_fork_choice_store;
mod beacon_snapshot;
mod block_verification;
mod errors;
pub mod events;
pub mod execution_engine;
mod head_tracker;
pub mod test_utils;

pub use self::beacon_chain::{BeaconChain, ChainConfig, OperationError, ReceiveOutcome};
pub use self::beacon_snapshot::BeaconSnapshot;
pub use attestation_verification::AttestationError;
pub use beacon_fork_choice_store::BeaconForkChoiceStore;
pub use block_verification::{BlockError, ExecutedBlock, SignatureVerifiedBlock};
pub use errors::BeaconChainError;
pub use events::{ChainEvent, ChainObserver};
pub use execution_engine::{EngineError, ExecutionEngine, MockExecutionEngine, PayloadStatus};
pub use head_tracker::HeadTracker;
pub use store::MemoryStore;
