use crate::{DepositData, FixedVector, Hash256};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::typenum::U33;
use tree_hash_derive::TreeHash;

pub const DEPOSIT_TREE_DEPTH: usize = 32;

/// A deposit to potentially become a beacon chain validator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    /// Branch of the deposit tree, one node per layer plus the mixed-in leaf count.
    pub proof: FixedVector<Hash256, U33>,
    pub data: DepositData,
}
