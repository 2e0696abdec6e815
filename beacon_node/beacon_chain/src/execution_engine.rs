//! The collaborator boundary towards the execution layer.
//!
//! The consensus core never validates execution payloads itself; it forwards them and reacts to
//! the engine's verdict. An unreachable engine leaves blocks optimistic rather than rejecting
//! them.

use parking_lot::Mutex;
use types::{EthSpec, ExecutionBlockHash, ExecutionPayload};

/// The verdict of the execution engine for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStatus {
    /// The payload is valid.
    Valid,
    /// The payload is invalid; the containing block and its descendants must be rejected.
    Invalid,
    /// The engine has not yet validated this payload's ancestry; the block stays optimistic.
    Syncing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine did not answer within the deadline. The block is neither accepted nor
    /// rejected.
    Unavailable,
}

pub trait ExecutionEngine<E: EthSpec>: Send + Sync {
    /// Instruct the engine to validate `payload`.
    fn notify_new_payload(
        &self,
        payload: &ExecutionPayload<E>,
    ) -> Result<PayloadStatus, EngineError>;

    /// Inform the engine of the consensus head and finalized block.
    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
    ) -> Result<(), EngineError>;
}

/// A scriptable engine for tests: valid by default, with switches for the other verdicts.
pub struct MockExecutionEngine {
    status: Mutex<Result<PayloadStatus, EngineError>>,
    forkchoice_updates: Mutex<Vec<(ExecutionBlockHash, ExecutionBlockHash)>>,
}

impl Default for MockExecutionEngine {
    fn default() -> Self {
        Self {
            status: Mutex::new(Ok(PayloadStatus::Valid)),
            forkchoice_updates: Mutex::new(vec![]),
        }
    }
}

impl MockExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// All subsequent `notify_new_payload` calls will return the given result.
    pub fn set_status(&self, status: Result<PayloadStatus, EngineError>) {
        *self.status.lock() = status;
    }

    /// The `(head, finalized)` pairs this engine has been told about, oldest first.
    pub fn forkchoice_updates(&self) -> Vec<(ExecutionBlockHash, ExecutionBlockHash)> {
        self.forkchoice_updates.lock().clone()
    }
}

impl<E: EthSpec> ExecutionEngine<E> for MockExecutionEngine {
    fn notify_new_payload(
        &self,
        _payload: &ExecutionPayload<E>,
    ) -> Result<PayloadStatus, EngineError> {
        self.status.lock().clone()
    }

    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
    ) -> Result<(), EngineError> {
        self.forkchoice_updates
            .lock()
            .push((head_block_hash, finalized_block_hash));
        Ok(())
    }
}
