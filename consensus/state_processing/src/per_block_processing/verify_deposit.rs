use super::errors::{BlockOperationError, DepositInvalid as Invalid};
use ethereum_hashing::{hash32_concat, ZERO_HASHES};
use tree_hash::TreeHash;
use types::{BeaconState, ChainSpec, Deposit, DepositData, EthSpec, Hash256, SignedRoot};

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

/// The deposit contract tree is 32 levels deep; the `Deposit` proof additionally carries the
/// mixed-in leaf count, hence 33 branch nodes.
pub const PROOF_LEN: usize = 33;

/// Verify `deposit.pubkey` signed `deposit.signature`.
pub fn verify_deposit_signature(deposit_data: &DepositData, spec: &ChainSpec) -> Result<()> {
    let deposit_message = deposit_data.as_deposit_message();
    let pubkey = deposit_data
        .pubkey
        .decompress()
        .map_err(|_| BlockOperationError::invalid(Invalid::BadSignature))?;
    let signature = deposit_data
        .signature
        .decompress()
        .map_err(|_| BlockOperationError::invalid(Invalid::BadSignature))?;

    let domain = spec.get_deposit_domain();
    let message = deposit_message.signing_root(domain);

    verify!(signature.verify(&pubkey, message), Invalid::BadSignature);

    Ok(())
}

/// Verify that the deposit's Merkle proof is valid against the state's eth1 deposit root.
pub fn verify_deposit_merkle_proof<T: EthSpec>(
    state: &BeaconState<T>,
    deposit: &Deposit,
    deposit_index: u64,
    _spec: &ChainSpec,
) -> Result<()> {
    let leaf = deposit.data.tree_hash_root();

    verify!(
        verify_merkle_proof(
            leaf,
            &deposit.proof[..],
            PROOF_LEN,
            deposit_index as usize,
            state.eth1_data.deposit_root,
        ),
        Invalid::BadMerkleProof
    );

    Ok(())
}

/// Verify a proof that `leaf` exists at `index` in a Merkle tree rooted at `root`.
///
/// The `branch` argument is the main component of the proof: it should be a list of internal node
/// hashes such that the root can be reconstructed (in bottom-up order).
fn verify_merkle_proof(
    leaf: Hash256,
    branch: &[Hash256],
    depth: usize,
    index: usize,
    root: Hash256,
) -> bool {
    if branch.len() != depth {
        return false;
    }
    merkle_root_from_branch(leaf, branch, depth, index) == root
}

fn merkle_root_from_branch(leaf: Hash256, branch: &[Hash256], depth: usize, index: usize) -> Hash256 {
    assert_eq!(branch.len(), depth, "proof length should equal depth");

    let mut merkle_root = leaf.as_bytes().to_vec();

    for (i, leaf) in branch.iter().enumerate().take(depth) {
        let ith_bit = (index >> i) & 0x01;
        if ith_bit == 1 {
            merkle_root = hash32_concat(leaf.as_bytes(), &merkle_root)[..].to_vec();
        } else {
            merkle_root = hash32_concat(&merkle_root, leaf.as_bytes())[..].to_vec();
        }
    }

    Hash256::from_slice(&merkle_root)
}

/// Compute the root of the deposit tree (including the mixed-in deposit count) for a list of
/// deposit data roots. Useful for constructing test states whose deposits verify.
pub fn deposit_tree_root_and_proofs(
    leaves: &[Hash256],
    deposit_count: u64,
) -> (Hash256, Vec<Vec<Hash256>>) {
    let depth = PROOF_LEN - 1;

    // Build every level of the (sparse) tree.
    let mut levels: Vec<Vec<Hash256>> = vec![leaves.to_vec()];
    for level_depth in 0..depth {
        let level = levels
            .last()
            .expect("levels is non-empty")
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or_else(|| {
                    Hash256::from_slice(&ZERO_HASHES[level_depth])
                });
                Hash256::from_slice(&hash32_concat(left.as_bytes(), right.as_bytes()))
            })
            .collect::<Vec<_>>();
        levels.push(level);
    }

    let tree_root = levels
        .last()
        .and_then(|level| level.first().copied())
        .unwrap_or_else(|| Hash256::from_slice(&ZERO_HASHES[depth]));

    // Mix in the deposit count.
    let mut count_bytes = [0u8; 32];
    count_bytes[0..8].copy_from_slice(&deposit_count.to_le_bytes());
    let root = Hash256::from_slice(&hash32_concat(tree_root.as_bytes(), &count_bytes));

    // Derive the branch for each leaf.
    let proofs = (0..leaves.len())
        .map(|leaf_index| {
            let mut proof = Vec::with_capacity(PROOF_LEN);
            let mut index = leaf_index;
            for level_depth in 0..depth {
                let sibling = index ^ 1;
                let node = levels[level_depth].get(sibling).copied().unwrap_or_else(|| {
                    Hash256::from_slice(&ZERO_HASHES[level_depth])
                });
                proof.push(node);
                index /= 2;
            }
            proof.push(Hash256::from_slice(&count_bytes));
            proof
        })
        .collect();

    (root, proofs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_proof_verifies() {
        let leaf = Hash256::repeat_byte(42);
        let (root, proofs) = deposit_tree_root_and_proofs(&[leaf], 1);

        assert!(verify_merkle_proof(leaf, &proofs[0], PROOF_LEN, 0, root));
        assert!(!verify_merkle_proof(
            Hash256::repeat_byte(43),
            &proofs[0],
            PROOF_LEN,
            0,
            root
        ));
    }

    #[test]
    fn multi_leaf_proofs_verify() {
        let leaves: Vec<_> = (0u8..5).map(Hash256::repeat_byte).collect();
        let (root, proofs) = deposit_tree_root_and_proofs(&leaves, leaves.len() as u64);

        for (i, leaf) in leaves.iter().enumerate() {
            assert!(
                verify_merkle_proof(*leaf, &proofs[i], PROOF_LEN, i, root),
                "proof {} should verify",
                i
            );
        }
    }
}
