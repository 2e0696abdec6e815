//! Verification of unaggregated and aggregated attestations arriving from the network, before
//! they touch fork choice or the operation pool.

use crate::beacon_chain::BeaconChain;
use crate::errors::BeaconChainError;
use state_processing::common::get_indexed_attestation;
use state_processing::per_block_processing::is_valid_indexed_attestation;
use state_processing::VerifySignatures;
use store::KeyValueStore;
use types::{
    Attestation, BeaconCommittee, Epoch, EthSpec, Hash256, IndexedAttestation, RelativeEpoch,
    Slot,
};

/// Reasons an attestation fails verification.
#[derive(Debug)]
pub enum AttestationError {
    /// The aggregation bitfield had no bits set.
    EmptyAggregationBitfield,
    /// The attestation points to a block we have not seen.
    UnknownHeadBlock { beacon_block_root: Hash256 },
    /// The attestation's target block is unknown.
    UnknownTargetRoot(Hash256),
    /// The attestation references a future epoch.
    FutureEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// The attestation is too old to be useful.
    PastEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    /// The target epoch does not match the attestation's slot.
    BadTargetEpoch { target: Epoch, slot: Slot },
    /// The committee index exceeds the committee count for the slot.
    NoCommitteeForSlotAndIndex { slot: Slot, index: u64 },
    /// The bitfield length does not match the committee size.
    Invalid(state_processing::per_block_processing::errors::BlockOperationError<
        state_processing::per_block_processing::errors::AttestationInvalid,
    >),
    /// The indexed attestation's aggregate signature failed.
    InvalidSignature,
    /// The attestation is from an epoch the head state cannot compute committees for.
    EpochOutOfRangeOfHeadState {
        attestation_epoch: Epoch,
        head_epoch: Epoch,
    },
    /// Fork choice rejected the attestation.
    ForkChoice(String),
    /// An internal error; the attestation's validity remains unknown.
    BeaconChainError(Box<BeaconChainError>),
}

impl AttestationError {
    /// `true` for attestations that are provably invalid, `false` for those that merely cannot
    /// be judged yet (unknown blocks, clock skew).
    pub fn is_rejection(&self) -> bool {
        match self {
            AttestationError::UnknownHeadBlock { .. }
            | AttestationError::UnknownTargetRoot(_)
            | AttestationError::FutureEpoch { .. }
            | AttestationError::PastEpoch { .. }
            | AttestationError::EpochOutOfRangeOfHeadState { .. }
            | AttestationError::BeaconChainError(_) => false,
            AttestationError::EmptyAggregationBitfield
            | AttestationError::BadTargetEpoch { .. }
            | AttestationError::NoCommitteeForSlotAndIndex { .. }
            | AttestationError::Invalid(_)
            | AttestationError::InvalidSignature
            | AttestationError::ForkChoice(_) => true,
        }
    }
}

impl From<BeaconChainError> for AttestationError {
    fn from(e: BeaconChainError) -> Self {
        AttestationError::BeaconChainError(Box::new(e))
    }
}

/// An attestation whose committee resolved, bitfield matched and aggregate signature verified.
pub struct VerifiedAttestation<E: EthSpec> {
    pub indexed: IndexedAttestation<E>,
}

impl<E: EthSpec> VerifiedAttestation<E> {
    pub fn verify<KV: KeyValueStore<E>>(
        attestation: &Attestation<E>,
        chain: &BeaconChain<E, KV>,
    ) -> Result<Self, AttestationError> {
        let data = &attestation.data;

        if attestation.num_set_aggregation_bits() == 0 {
            return Err(AttestationError::EmptyAggregationBitfield);
        }

        let current_epoch = chain.current_slot().epoch(E::slots_per_epoch());
        if data.target.epoch > current_epoch {
            return Err(AttestationError::FutureEpoch {
                attestation_epoch: data.target.epoch,
                current_epoch,
            });
        }
        if data.target.epoch + 1 < current_epoch {
            return Err(AttestationError::PastEpoch {
                attestation_epoch: data.target.epoch,
                current_epoch,
            });
        }
        if data.target.epoch != data.slot.epoch(E::slots_per_epoch()) {
            return Err(AttestationError::BadTargetEpoch {
                target: data.target.epoch,
                slot: data.slot,
            });
        }

        // Both the vote and its target must point at known blocks.
        if !chain.fork_choice_contains_block(&data.beacon_block_root) {
            return Err(AttestationError::UnknownHeadBlock {
                beacon_block_root: data.beacon_block_root,
            });
        }
        if !chain.fork_choice_contains_block(&data.target.root) {
            return Err(AttestationError::UnknownTargetRoot(data.target.root));
        }

        // Resolve the committee against the head state. The head state carries committee caches
        // for its previous, current and next epochs, which covers any attestation the epoch
        // checks above admit, except across long idle stretches where we fall back to ignoring.
        let head = chain.head_snapshot();
        let head_state = &head.beacon_state;

        let relative_epoch = RelativeEpoch::from_epoch(
            head_state.current_epoch(),
            data.slot.epoch(E::slots_per_epoch()),
        )
        .map_err(|_| AttestationError::EpochOutOfRangeOfHeadState {
            attestation_epoch: data.slot.epoch(E::slots_per_epoch()),
            head_epoch: head_state.current_epoch(),
        })?;

        let committee: BeaconCommittee = head_state
            .committee_cache(relative_epoch)
            .map_err(BeaconChainError::from)?
            .get_beacon_committee(data.slot, data.index)
            .ok_or(AttestationError::NoCommitteeForSlotAndIndex {
                slot: data.slot,
                index: data.index,
            })?;

        let indexed = get_indexed_attestation(committee.committee, attestation)
            .map_err(AttestationError::Invalid)?;

        let verify_signatures = if chain.config.verify_signatures {
            VerifySignatures::True
        } else {
            VerifySignatures::False
        };
        is_valid_indexed_attestation(head_state, &indexed, verify_signatures, &chain.spec)
            .map_err(|_| AttestationError::InvalidSignature)?;

        Ok(Self { indexed })
    }
}
