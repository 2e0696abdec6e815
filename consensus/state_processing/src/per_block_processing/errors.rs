use crate::ContextError;
use safe_arith::ArithError;
use types::{Checkpoint, Epoch, ExecutionBlockHash, Hash256, Slot};

/// The error returned from the `per_block_processing` function. Indicates that a block is either
/// invalid, or we were unable to determine its validity (we encountered an unexpected error).
///
/// Any of the `...Error` variants indicate that at some point during block (and block operation)
/// verification, there was an error. There is no indication as to _where_ that error happened
/// (e.g., when processing attestations instead of when processing deposits).
#[derive(Debug, PartialEq, Clone)]
pub enum BlockProcessingError {
    /// The header is invalid in a way described by `HeaderInvalid`.
    HeaderInvalid {
        reason: HeaderInvalid,
    },
    /// The proposer signature over the block is invalid.
    ProposalSignatureInvalid,
    /// The randao reveal failed BLS verification.
    RandaoSignatureInvalid,
    ProposerSlashingInvalid {
        index: usize,
        reason: ProposerSlashingInvalid,
    },
    AttesterSlashingInvalid {
        index: usize,
        reason: AttesterSlashingInvalid,
    },
    AttestationInvalid {
        index: usize,
        reason: AttestationInvalid,
    },
    DepositInvalid {
        index: usize,
        reason: DepositInvalid,
    },
    ExitInvalid {
        index: usize,
        reason: ExitInvalid,
    },
    SyncAggregateInvalid {
        reason: SyncAggregateInvalid,
    },
    ExecutionPayloadInvalid {
        reason: ExecutionPayloadInvalid,
    },
    DepositCountInvalid {
        expected: usize,
        found: usize,
    },
    BeaconStateError(types::BeaconStateError),
    SszTypesError(ssz_types::Error),
    ArithError(ArithError),
    ContextError(ContextError),
}

impl From<types::BeaconStateError> for BlockProcessingError {
    fn from(e: types::BeaconStateError) -> Self {
        BlockProcessingError::BeaconStateError(e)
    }
}

impl From<ssz_types::Error> for BlockProcessingError {
    fn from(e: ssz_types::Error) -> Self {
        BlockProcessingError::SszTypesError(e)
    }
}

impl From<ArithError> for BlockProcessingError {
    fn from(e: ArithError) -> Self {
        BlockProcessingError::ArithError(e)
    }
}

impl From<ContextError> for BlockProcessingError {
    fn from(e: ContextError) -> Self {
        BlockProcessingError::ContextError(e)
    }
}

impl From<BlockOperationError<HeaderInvalid>> for BlockProcessingError {
    fn from(e: BlockOperationError<HeaderInvalid>) -> Self {
        match e {
            BlockOperationError::Invalid(reason) => BlockProcessingError::HeaderInvalid { reason },
            BlockOperationError::BeaconStateError(e) => BlockProcessingError::BeaconStateError(e),
            BlockOperationError::SszTypesError(e) => BlockProcessingError::SszTypesError(e),
            BlockOperationError::ArithError(e) => BlockProcessingError::ArithError(e),
        }
    }
}

impl From<BlockOperationError<SyncAggregateInvalid>> for BlockProcessingError {
    fn from(e: BlockOperationError<SyncAggregateInvalid>) -> Self {
        match e {
            BlockOperationError::Invalid(reason) => {
                BlockProcessingError::SyncAggregateInvalid { reason }
            }
            BlockOperationError::BeaconStateError(e) => BlockProcessingError::BeaconStateError(e),
            BlockOperationError::SszTypesError(e) => BlockProcessingError::SszTypesError(e),
            BlockOperationError::ArithError(e) => BlockProcessingError::ArithError(e),
        }
    }
}

impl From<BlockOperationError<ExecutionPayloadInvalid>> for BlockProcessingError {
    fn from(e: BlockOperationError<ExecutionPayloadInvalid>) -> Self {
        match e {
            BlockOperationError::Invalid(reason) => {
                BlockProcessingError::ExecutionPayloadInvalid { reason }
            }
            BlockOperationError::BeaconStateError(e) => BlockProcessingError::BeaconStateError(e),
            BlockOperationError::SszTypesError(e) => BlockProcessingError::SszTypesError(e),
            BlockOperationError::ArithError(e) => BlockProcessingError::ArithError(e),
        }
    }
}

pub type ProposerSlashingValidationError = BlockOperationError<ProposerSlashingInvalid>;
pub type AttesterSlashingValidationError = BlockOperationError<AttesterSlashingInvalid>;
pub type AttestationValidationError = BlockOperationError<AttestationInvalid>;
pub type DepositValidationError = BlockOperationError<DepositInvalid>;
pub type ExitValidationError = BlockOperationError<ExitInvalid>;

/// A conversion that consumes `self` and adds an `index` variable to resulting struct.
///
/// Used here to allow converting an error into an upstream error that points to the object that
/// caused the error. For example, pointing to the index of an attestation that caused the
/// `AttestationInvalid` error.
pub trait IntoWithIndex<T>: Sized {
    fn into_with_index(self, index: usize) -> T;
}

/// An invalid object in a block, with the error specialized per operation kind.
#[derive(Debug, PartialEq, Clone)]
pub enum BlockOperationError<T> {
    Invalid(T),
    BeaconStateError(types::BeaconStateError),
    SszTypesError(ssz_types::Error),
    ArithError(ArithError),
}

impl<T> BlockOperationError<T> {
    pub fn invalid(reason: T) -> BlockOperationError<T> {
        BlockOperationError::Invalid(reason)
    }
}

impl<T> From<types::BeaconStateError> for BlockOperationError<T> {
    fn from(e: types::BeaconStateError) -> Self {
        BlockOperationError::BeaconStateError(e)
    }
}

impl<T> From<ssz_types::Error> for BlockOperationError<T> {
    fn from(e: ssz_types::Error) -> Self {
        BlockOperationError::SszTypesError(e)
    }
}

impl<T> From<ArithError> for BlockOperationError<T> {
    fn from(e: ArithError) -> Self {
        BlockOperationError::ArithError(e)
    }
}

macro_rules! impl_into_block_processing_error_with_index {
    ($($reason_ty: ident => $error_variant: ident),*) => {
        $(
            impl IntoWithIndex<BlockProcessingError> for BlockOperationError<$reason_ty> {
                fn into_with_index(self, index: usize) -> BlockProcessingError {
                    match self {
                        BlockOperationError::Invalid(reason) => BlockProcessingError::$error_variant {
                            index,
                            reason
                        },
                        BlockOperationError::BeaconStateError(e) => BlockProcessingError::BeaconStateError(e),
                        BlockOperationError::SszTypesError(e) => BlockProcessingError::SszTypesError(e),
                        BlockOperationError::ArithError(e) => BlockProcessingError::ArithError(e),
                    }
                }
            }
        )*
    };
}

impl_into_block_processing_error_with_index!(
    ProposerSlashingInvalid => ProposerSlashingInvalid,
    AttesterSlashingInvalid => AttesterSlashingInvalid,
    AttestationInvalid => AttestationInvalid,
    DepositInvalid => DepositInvalid,
    ExitInvalid => ExitInvalid
);

/// Describes why an object is invalid.
#[derive(Debug, PartialEq, Clone)]
pub enum HeaderInvalid {
    ProposalSignatureInvalid,
    StateSlotMismatch {
        block_slot: Slot,
        state_slot: Slot,
    },
    OlderThanLatestBlockHeader {
        block_slot: Slot,
        latest_block_header_slot: Slot,
    },
    ProposerIndexMismatch {
        block_proposer_index: u64,
        state_proposer_index: u64,
    },
    ParentBlockRootMismatch {
        state: Hash256,
        block: Hash256,
    },
    ProposerSlashed(u64),
}

#[derive(Debug, PartialEq, Clone)]
pub enum ProposerSlashingInvalid {
    /// The proposal signature slots were not equal.
    ProposalSlotMismatch(Slot, Slot),
    /// The two proposals have different proposer indices.
    ProposerIndexMismatch(u64, u64),
    /// The proposals are identical and therefore not slashable.
    ProposalsIdentical,
    /// The specified proposer cannot be slashed because they are already slashed, or not active.
    ProposerNotSlashable(u64),
    /// The proposer index is not known in the present state.
    ProposerUnknown(u64),
    /// The first proposal signature was invalid.
    BadProposal1Signature,
    /// The second proposal signature was invalid.
    BadProposal2Signature,
}

#[derive(Debug, PartialEq, Clone)]
pub enum AttesterSlashingInvalid {
    /// The attestations were not in conflict.
    NotSlashable,
    /// The first `IndexedAttestation` was invalid.
    IndexedAttestation1Invalid(IndexedAttestationInvalid),
    /// The second `IndexedAttestation` was invalid.
    IndexedAttestation2Invalid(IndexedAttestationInvalid),
    /// There were no indices able to be slashed.
    NoSlashableIndices,
}

#[derive(Debug, PartialEq, Clone)]
pub enum AttestationInvalid {
    /// Attestation references a pre-genesis slot.
    PreGenesis { genesis: Slot, attestation: Slot },
    /// Attestation included before the inclusion delay.
    IncludedTooEarly {
        state: Slot,
        delay: u64,
        attestation: Slot,
    },
    /// Attestation slot is too far in the past to be included in a block.
    IncludedTooLate { state: Slot, attestation: Slot },
    /// Attestation target epoch does not match attestation slot.
    TargetEpochSlotMismatch {
        target_epoch: Epoch,
        slot_epoch: Epoch,
    },
    /// Attestation target epoch does not match the current or previous epoch.
    BadTargetEpoch,
    /// The attestation's committee index is out of range for its slot.
    BadCommitteeIndex,
    /// The aggregation bitfield length is not the smallest possible size to represent the
    /// committee.
    BadAggregationBitfieldLength {
        committee_len: usize,
        bitfield_len: usize,
    },
    /// The attestation's source checkpoint did not match the state's justified checkpoint.
    WrongJustifiedCheckpoint {
        state: Box<Checkpoint>,
        attestation: Box<Checkpoint>,
        is_current: bool,
    },
    /// There were no set aggregation bits.
    AggregationBitfieldIsEmpty,
    /// The indexed attestation derived from this attestation was invalid.
    BadIndexedAttestation(IndexedAttestationInvalid),
}

#[derive(Debug, PartialEq, Clone)]
pub enum IndexedAttestationInvalid {
    /// The number of indices is 0.
    IndicesEmpty,
    /// The validator indices were not in increasing order.
    BadValidatorIndicesOrdering(usize),
    /// The validator index is unknown. One cannot slash one who does not exist.
    UnknownValidator(u64),
    /// The indexed attestation aggregate signature was not valid.
    BadSignature,
    /// A valid aggregate signature could not be assembled from the compressed keys.
    SignatureSetError,
}

#[derive(Debug, PartialEq, Clone)]
pub enum DepositInvalid {
    /// The deposit index does not match the state index.
    BadIndex { state: u64, deposit: u64 },
    /// The proof was invalid against the state's deposit root.
    BadMerkleProof,
    /// The signature was invalid (deposits with invalid signatures are skipped, not rejected).
    BadSignature,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExitInvalid {
    /// The specified validator is not active.
    NotActive(u64),
    /// The specified validator is not in the state's validator registry.
    ValidatorUnknown(u64),
    /// The specified validator has a non-default exit epoch.
    AlreadyExited(u64),
    /// The exit is for a future epoch.
    FutureEpoch { state: Epoch, exit: Epoch },
    /// The validator has not been active for long enough.
    TooYoungToExit {
        current_epoch: Epoch,
        earliest_exit_epoch: Epoch,
    },
    /// The exit signature was invalid.
    BadSignature,
}

#[derive(Debug, PartialEq, Clone)]
pub enum SyncAggregateInvalid {
    /// A participant's public key could not be decompressed or was unknown.
    ParticipantPubkeyInvalid,
    /// The aggregate signature over all participants failed verification.
    SignatureInvalid,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExecutionPayloadInvalid {
    /// The payload's parent hash does not chain onto the header in state.
    ParentHashMismatch {
        state: ExecutionBlockHash,
        payload: ExecutionBlockHash,
    },
    /// The payload's randao does not match the state's accumulator.
    PrevRandaoMismatch { state: Hash256, payload: Hash256 },
    /// The payload timestamp does not match the slot.
    TimestampMismatch { state: u64, payload: u64 },
}
