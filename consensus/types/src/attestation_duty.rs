use crate::{CommitteeIndex, Slot};

/// The assignment of a single validator within its attestation committee.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttestationDuty {
    /// The slot during which the attester must attest.
    pub slot: Slot,
    /// The index of this committee within the committees in `slot`.
    pub index: CommitteeIndex,
    /// The position of the attester within the committee.
    pub committee_position: usize,
    /// The total number of attesters in the committee.
    pub committee_len: usize,
}
