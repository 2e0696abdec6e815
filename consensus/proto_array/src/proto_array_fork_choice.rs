use crate::error::Error;
use crate::proto_array::{Block, ProtoArray, ProtoNode};
use crate::ssz_container::SszContainer;
use serde_derive::{Deserialize, Serialize};
use ssz::{Decode, Encode};
use ssz_derive::{Decode, Encode};
use std::collections::BTreeSet;
use types::{Checkpoint, Epoch, Hash256, Slot};

pub const DEFAULT_PRUNE_THRESHOLD: usize = 256;

/// The latest message of a single validator: the subtree it votes for and the target epoch the
/// vote was cast at.
#[derive(Default, PartialEq, Clone, Debug, Encode, Decode, Serialize, Deserialize)]
pub struct VoteTracker {
    current_root: Hash256,
    next_root: Hash256,
    next_epoch: Epoch,
}

/// A Vec-wrapper which will grow to match any request.
///
/// E.g., a `get` or `insert` to an out-of-bounds element will cause the Vec to grow (using
/// Default) to the smallest size required to fulfill the request.
#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElasticList<T>(pub Vec<T>);

impl<T> ElasticList<T>
where
    T: Default,
{
    fn ensure(&mut self, i: usize) {
        if self.0.len() <= i {
            self.0.resize_with(i + 1, Default::default);
        }
    }

    pub fn get_mut(&mut self, i: usize) -> &mut T {
        self.ensure(i);
        &mut self.0[i]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.iter_mut()
    }
}

#[derive(PartialEq, Debug, Serialize, Deserialize)]
pub struct ProtoArrayForkChoice {
    pub(crate) proto_array: ProtoArray,
    pub(crate) votes: ElasticList<VoteTracker>,
    pub(crate) balances: Vec<u64>,
}

impl ProtoArrayForkChoice {
    /// Instantiate from the block that fork choice will treat as its root (usually genesis or a
    /// finalized checkpoint block).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        finalized_block_slot: Slot,
        finalized_block_state_root: Hash256,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        anchor_target_root: Hash256,
        anchor_execution_status: crate::ExecutionStatus,
    ) -> Result<Self, Error> {
        let mut proto_array = ProtoArray {
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            justified_checkpoint,
            finalized_checkpoint,
            nodes: Vec::with_capacity(1),
            indices: std::collections::HashMap::with_capacity(1),
        };

        let block = Block {
            slot: finalized_block_slot,
            root: finalized_checkpoint.root,
            parent_root: None,
            state_root: finalized_block_state_root,
            target_root: anchor_target_root,
            justified_checkpoint,
            finalized_checkpoint,
            unrealized_justified_checkpoint: Some(justified_checkpoint),
            unrealized_finalized_checkpoint: Some(finalized_checkpoint),
            execution_status: anchor_execution_status,
        };

        proto_array
            .on_block(block)
            .map_err(|_| Error::NodeUnknown(finalized_checkpoint.root))?;

        Ok(Self {
            proto_array,
            votes: ElasticList::default(),
            balances: vec![],
        })
    }

    /// Process a (previously verified) attestation's LMD vote.
    pub fn process_attestation(
        &mut self,
        validator_index: usize,
        block_root: Hash256,
        target_epoch: Epoch,
    ) -> Result<(), Error> {
        let vote = self.votes.get_mut(validator_index);

        if target_epoch > vote.next_epoch || *vote == VoteTracker::default() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }

        Ok(())
    }

    /// Add a block to the fork-choice DAG.
    pub fn process_block(&mut self, block: Block) -> Result<(), Error> {
        self.proto_array.on_block(block)
    }

    /// Run the fork-choice rule: apply pending vote and balance changes, then walk the
    /// best-descendant links from the justified block.
    pub fn find_head(
        &mut self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        justified_state_balances: &[u64],
        equivocating_indices: &BTreeSet<u64>,
    ) -> Result<Hash256, Error> {
        let old_balances = &mut self.balances;
        let new_balances = justified_state_balances;

        let deltas = compute_deltas(
            &self.proto_array.indices,
            &mut self.votes,
            old_balances,
            new_balances,
            equivocating_indices,
        )?;

        self.proto_array
            .apply_score_changes(deltas, justified_checkpoint, finalized_checkpoint)?;

        *old_balances = new_balances.to_vec();

        self.proto_array.find_head(&justified_checkpoint.root)
    }

    /// Mark a block and its descendants as having an invalid execution payload.
    pub fn process_execution_payload_invalidation(&mut self, root: &Hash256) -> Result<(), Error> {
        self.proto_array.propagate_execution_payload_invalidation(root)
    }

    pub fn maybe_prune(&mut self, finalized_root: Hash256) -> Result<(), Error> {
        self.proto_array.maybe_prune(finalized_root)
    }

    pub fn set_prune_threshold(&mut self, prune_threshold: usize) {
        self.proto_array.prune_threshold = prune_threshold;
    }

    pub fn len(&self) -> usize {
        self.proto_array.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proto_array.nodes.is_empty()
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.proto_array.indices.contains_key(block_root)
    }

    pub fn get_node(&self, block_root: &Hash256) -> Option<&ProtoNode> {
        self.proto_array.get_node(block_root)
    }

    pub fn get_block(&self, block_root: &Hash256) -> Option<Block> {
        let node = self.proto_array.get_node(block_root)?;
        let parent_root = node
            .parent
            .and_then(|i| self.proto_array.nodes.get(i))
            .map(|parent| parent.root);

        Some(Block {
            slot: node.slot,
            root: node.root,
            parent_root,
            state_root: node.state_root,
            target_root: node.target_root,
            justified_checkpoint: node.justified_checkpoint,
            finalized_checkpoint: node.finalized_checkpoint,
            unrealized_justified_checkpoint: node.unrealized_justified_checkpoint,
            unrealized_finalized_checkpoint: node.unrealized_finalized_checkpoint,
            execution_status: node.execution_status,
        })
    }

    pub fn get_weight(&self, block_root: &Hash256) -> Option<u64> {
        self.proto_array.get_node(block_root).map(|node| node.weight)
    }

    /// Returns `true` if `descendant_root` descends from (or is) `ancestor_root`.
    pub fn is_descendant(&self, ancestor_root: Hash256, descendant_root: Hash256) -> bool {
        self.proto_array.is_descendant(ancestor_root, descendant_root)
    }

    /// Returns the latest message for a given validator, if any.
    ///
    /// Returns `(block_root, target_epoch)`.
    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        if validator_index < self.votes.0.len() {
            let vote = &self.votes.0[validator_index];

            if *vote == VoteTracker::default() {
                None
            } else {
                Some((vote.next_root, vote.next_epoch))
            }
        } else {
            None
        }
    }

    /// Direct, read-only access to the underlying array.
    pub fn core_proto_array(&self) -> &ProtoArray {
        &self.proto_array
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        SszContainer::from(self).as_ssz_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        SszContainer::from_ssz_bytes(bytes)
            .map(Into::into)
            .map_err(|e| format!("Failed to decode ProtoArrayForkChoice: {:?}", e))
    }
}

/// Returns a list of `deltas`, where there is one delta for each of the indices in
/// `indices`.
///
/// The deltas are formed by a change between `old_balances` and `new_balances`, and/or a change
/// of vote in `votes`.
///
/// ## Errors
///
/// - If a value in `indices` is greater to or equal to `indices.len()`.
/// - If some `Hash256` in `votes` is not a key in `indices` (except for `Hash256::zero()`, this
///   is always valid).
fn compute_deltas(
    indices: &std::collections::HashMap<Hash256, usize>,
    votes: &mut ElasticList<VoteTracker>,
    old_balances: &[u64],
    new_balances: &[u64],
    equivocating_indices: &BTreeSet<u64>,
) -> Result<Vec<i64>, Error> {
    let mut deltas = vec![0_i64; indices.len()];

    for (val_index, vote) in votes.iter_mut().enumerate() {
        // There is no need to create a score change if the validator has never voted or both
        // their votes are for the zero hash (alias to the genesis block).
        if vote.current_root == Hash256::zero() && vote.next_root == Hash256::zero() {
            continue;
        }

        // Validators that have equivocated have their weight removed from their last vote and
        // never re-applied.
        if equivocating_indices.contains(&(val_index as u64)) {
            let old_balance = old_balances.get(val_index).copied().unwrap_or(0);
            if let Some(current_delta_index) = indices.get(&vote.current_root).copied() {
                let delta = deltas
                    .get(current_delta_index)
                    .ok_or(Error::InvalidNodeDelta(current_delta_index))?
                    .checked_sub(old_balance as i64)
                    .ok_or(Error::DeltaOverflow(current_delta_index))?;
                deltas[current_delta_index] = delta;
            }
            *vote = VoteTracker::default();
            continue;
        }

        // If the validator was not included in the `old_balances` (i.e., it did not exist yet)
        // then say its balance was zero.
        let old_balance = old_balances.get(val_index).copied().unwrap_or(0);

        // If the validator's vote is not known in the `new_balances`, then use a balance of zero.
        //
        // It is possible that there is a vote for an unknown validator if we change our justified
        // state to a new state with a higher epoch that is on a different fork because that fork
        // may have on-boarded fewer validators than the prior fork.
        let new_balance = new_balances.get(val_index).copied().unwrap_or(0);

        if vote.current_root != vote.next_root || old_balance != new_balance {
            // We ignore the vote if it is not known in `indices`. We assume that it is outside
            // of our tree (i.e., pre-finalization) and therefore not interesting.
            if let Some(current_delta_index) = indices.get(&vote.current_root).copied() {
                let delta = deltas
                    .get(current_delta_index)
                    .ok_or(Error::InvalidNodeDelta(current_delta_index))?
                    .checked_sub(old_balance as i64)
                    .ok_or(Error::DeltaOverflow(current_delta_index))?;
                deltas[current_delta_index] = delta;
            }

            // We ignore the vote if it is not known in `indices`. We assume that it is outside
            // of our tree (i.e., pre-finalization) and therefore not interesting.
            if let Some(next_delta_index) = indices.get(&vote.next_root).copied() {
                let delta = deltas
                    .get(next_delta_index)
                    .ok_or(Error::InvalidNodeDelta(next_delta_index))?
                    .checked_add(new_balance as i64)
                    .ok_or(Error::DeltaOverflow(next_delta_index))?;
                deltas[next_delta_index] = delta;
            }

            vote.current_root = vote.next_root;
        }
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExecutionStatus;

    fn genesis_checkpoint() -> Checkpoint {
        Checkpoint {
            epoch: Epoch::new(0),
            root: Hash256::repeat_byte(1),
        }
    }

    fn new_fork_choice() -> ProtoArrayForkChoice {
        let cp = genesis_checkpoint();
        ProtoArrayForkChoice::new(
            Slot::new(0),
            Hash256::zero(),
            cp,
            cp,
            cp.root,
            ExecutionStatus::Valid(types::ExecutionBlockHash::zero()),
        )
        .unwrap()
    }

    fn simple_block(root_byte: u8, parent_byte: u8, slot: u64) -> Block {
        let cp = genesis_checkpoint();
        Block {
            slot: Slot::new(slot),
            root: Hash256::repeat_byte(root_byte),
            parent_root: Some(Hash256::repeat_byte(parent_byte)),
            state_root: Hash256::zero(),
            target_root: cp.root,
            justified_checkpoint: cp,
            finalized_checkpoint: cp,
            unrealized_justified_checkpoint: Some(cp),
            unrealized_finalized_checkpoint: Some(cp),
            execution_status: ExecutionStatus::Optimistic(types::ExecutionBlockHash::zero()),
        }
    }

    #[test]
    fn tie_breaks_by_greater_root() {
        let mut fc = new_fork_choice();
        let cp = genesis_checkpoint();

        // Two competing children of the anchor, no votes at all.
        fc.process_block(simple_block(2, 1, 1)).unwrap();
        fc.process_block(simple_block(3, 1, 1)).unwrap();

        let head = fc
            .find_head(cp, cp, &[], &BTreeSet::new())
            .unwrap();
        assert_eq!(head, Hash256::repeat_byte(3), "higher root wins ties");
    }

    #[test]
    fn votes_move_the_head() {
        let mut fc = new_fork_choice();
        let cp = genesis_checkpoint();
        let balances = vec![1, 1, 1];

        fc.process_block(simple_block(2, 1, 1)).unwrap();
        fc.process_block(simple_block(3, 1, 1)).unwrap();

        // Two validators vote for the lower root, one for the higher.
        fc.process_attestation(0, Hash256::repeat_byte(2), Epoch::new(1))
            .unwrap();
        fc.process_attestation(1, Hash256::repeat_byte(2), Epoch::new(1))
            .unwrap();
        fc.process_attestation(2, Hash256::repeat_byte(3), Epoch::new(1))
            .unwrap();

        let head = fc.find_head(cp, cp, &balances, &BTreeSet::new()).unwrap();
        assert_eq!(head, Hash256::repeat_byte(2));
    }

    #[test]
    fn equivocating_validator_loses_weight_permanently() {
        let mut fc = new_fork_choice();
        let cp = genesis_checkpoint();
        let balances = vec![1, 1, 1];

        fc.process_block(simple_block(2, 1, 1)).unwrap();
        fc.process_block(simple_block(3, 1, 1)).unwrap();

        fc.process_attestation(0, Hash256::repeat_byte(2), Epoch::new(1))
            .unwrap();
        fc.process_attestation(1, Hash256::repeat_byte(2), Epoch::new(1))
            .unwrap();
        fc.process_attestation(2, Hash256::repeat_byte(3), Epoch::new(1))
            .unwrap();

        let head = fc.find_head(cp, cp, &balances, &BTreeSet::new()).unwrap();
        assert_eq!(head, Hash256::repeat_byte(2));

        // Both voters for block 2 equivocate; the remaining vote flips the head.
        let equivocators: BTreeSet<u64> = vec![0, 1].into_iter().collect();
        let head = fc.find_head(cp, cp, &balances, &equivocators).unwrap();
        assert_eq!(head, Hash256::repeat_byte(3));

        // Their weight must not return even if they are no longer flagged.
        let head = fc.find_head(cp, cp, &balances, &BTreeSet::new()).unwrap();
        assert_eq!(head, Hash256::repeat_byte(3));
    }

    #[test]
    fn pruning_rebases_indices() {
        let mut fc = new_fork_choice();
        fc.set_prune_threshold(0);
        let cp = genesis_checkpoint();

        fc.process_block(simple_block(2, 1, 1)).unwrap();
        fc.process_block(simple_block(3, 2, 2)).unwrap();
        fc.process_block(simple_block(4, 3, 3)).unwrap();

        // Finalize block 3.
        fc.maybe_prune(Hash256::repeat_byte(3)).unwrap();

        assert_eq!(fc.len(), 2);
        assert!(!fc.contains_block(&Hash256::repeat_byte(2)));
        assert!(fc.contains_block(&Hash256::repeat_byte(3)));
        assert!(fc.contains_block(&Hash256::repeat_byte(4)));
        assert!(fc.is_descendant(Hash256::repeat_byte(3), Hash256::repeat_byte(4)));
    }

    #[test]
    fn invalid_payload_poisons_descendants() {
        let mut fc = new_fork_choice();
        let cp = genesis_checkpoint();

        fc.process_block(simple_block(2, 1, 1)).unwrap();
        fc.process_block(simple_block(3, 2, 2)).unwrap();
        fc.process_block(simple_block(4, 1, 1)).unwrap();

        fc.process_execution_payload_invalidation(&Hash256::repeat_byte(2))
            .unwrap();

        assert!(fc
            .get_block(&Hash256::repeat_byte(3))
            .unwrap()
            .execution_status
            .is_invalid());
        // The sibling is untouched.
        assert!(!fc
            .get_block(&Hash256::repeat_byte(4))
            .unwrap()
            .execution_status
            .is_invalid());

        let head = fc.find_head(cp, cp, &[], &BTreeSet::new()).unwrap();
        assert_eq!(head, Hash256::repeat_byte(4));
    }

    #[test]
    fn ssz_round_trip() {
        let mut fc = new_fork_choice();
        fc.process_block(simple_block(2, 1, 1)).unwrap();
        fc.process_attestation(0, Hash256::repeat_byte(2), Epoch::new(1))
            .unwrap();

        let bytes = fc.as_bytes();
        let decoded = ProtoArrayForkChoice::from_bytes(&bytes).unwrap();
        assert_eq!(fc, decoded);
    }
}
