//! The "swap-or-not" shuffle used to assign validators to committees.
//!
//! Each round derives a pivot from the seed, mirrors the index about it and consults one bit of a
//! per-round hash to decide whether the index swaps to its mirror. Shuffling an entire list and
//! shuffling a single index agree: `shuffle_list(input, ..)[i] == input[shuffled_index(i, ..)]`.

use ethereum_hashing::hash;
use std::collections::HashMap;

const SEED_SIZE: usize = 32;
const PIVOT_VIEW_SIZE: usize = SEED_SIZE + 1;
const TOTAL_SIZE: usize = SEED_SIZE + 1 + 4;

/// Return the index that `index` is permuted to under the seed, or `None` if `index` is out of
/// bounds or `list_size` is too large to shuffle safely.
pub fn compute_shuffled_index(
    index: usize,
    list_size: usize,
    seed: &[u8],
    shuffle_round_count: u8,
) -> Option<usize> {
    if index >= list_size || list_size > 2usize.pow(40) || seed.len() != SEED_SIZE {
        return None;
    }

    let mut index = index;
    for round in 0..shuffle_round_count {
        let pivot = round_pivot(seed, round, list_size);
        let flip = (pivot + list_size - index) % list_size;
        let position = std::cmp::max(index, flip);

        let source = position_source(seed, round, position);
        let byte = source[(position % 256) / 8];
        let bit = (byte >> (position % 8)) % 2;

        if bit == 1 {
            index = flip;
        }
    }

    Some(index)
}

/// Shuffle an entire list under the seed.
///
/// With `forwards == false` the rounds run in reverse, producing the inverse permutation of the
/// forwards shuffle. Committee assignment uses the forwards direction.
pub fn shuffle_list<T: Clone>(
    input: Vec<T>,
    shuffle_round_count: u8,
    seed: &[u8],
    forwards: bool,
) -> Option<Vec<T>> {
    let list_size = input.len();
    if list_size > 2usize.pow(40) || seed.len() != SEED_SIZE {
        return None;
    }
    if list_size <= 1 {
        return Some(input);
    }

    // Hash sources repeat for every 256 positions within a round; memoize them rather than
    // re-hashing once per index.
    let mut sources: HashMap<(u8, usize), Vec<u8>> = HashMap::new();
    let mut permute_one = |mut index: usize| -> usize {
        let rounds: Box<dyn Iterator<Item = u8>> = if forwards {
            Box::new(0..shuffle_round_count)
        } else {
            Box::new((0..shuffle_round_count).rev())
        };
        for round in rounds {
            let pivot = round_pivot(seed, round, list_size);
            let flip = (pivot + list_size - index) % list_size;
            let position = std::cmp::max(index, flip);

            let source = sources
                .entry((round, position / 256))
                .or_insert_with(|| position_source(seed, round, position));
            let byte = source[(position % 256) / 8];
            let bit = (byte >> (position % 8)) % 2;

            if bit == 1 {
                index = flip;
            }
        }
        index
    };

    Some(
        (0..list_size)
            .map(|i| input[permute_one(i)].clone())
            .collect(),
    )
}

fn round_pivot(seed: &[u8], round: u8, list_size: usize) -> usize {
    let mut buf = [0; PIVOT_VIEW_SIZE];
    buf[..SEED_SIZE].copy_from_slice(seed);
    buf[SEED_SIZE] = round;
    let digest = hash(&buf);

    let mut eight = [0; 8];
    eight.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(eight) % list_size as u64) as usize
}

fn position_source(seed: &[u8], round: u8, position: usize) -> Vec<u8> {
    let mut buf = [0; TOTAL_SIZE];
    buf[..SEED_SIZE].copy_from_slice(seed);
    buf[SEED_SIZE] = round;
    buf[SEED_SIZE + 1..].copy_from_slice(&((position / 256) as u32).to_le_bytes());
    hash(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_seed() -> Vec<u8> {
        vec![42; SEED_SIZE]
    }

    #[test]
    fn returns_none_for_out_of_bounds() {
        assert_eq!(compute_shuffled_index(10, 10, &test_seed(), 90), None);
        assert_eq!(compute_shuffled_index(0, 0, &test_seed(), 90), None);
    }

    #[test]
    fn returns_none_for_bad_seed_length() {
        assert_eq!(compute_shuffled_index(0, 10, &[42; 31], 90), None);
        assert_eq!(shuffle_list(vec![0usize; 10], 90, &[42; 31], true), None);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let input: Vec<usize> = (0..97).collect();
        let mut shuffled = shuffle_list(input.clone(), 90, &test_seed(), true).unwrap();
        assert_ne!(input, shuffled);
        shuffled.sort_unstable();
        assert_eq!(input, shuffled);
    }

    #[test]
    fn whole_list_matches_single_index() {
        let list_size = 64;
        let input: Vec<usize> = (0..list_size).collect();
        let shuffled = shuffle_list(input.clone(), 90, &test_seed(), true).unwrap();

        for i in 0..list_size {
            let single = compute_shuffled_index(i, list_size, &test_seed(), 90).unwrap();
            assert_eq!(shuffled[i], input[single]);
        }
    }

    #[test]
    fn backwards_inverts_forwards() {
        let input: Vec<usize> = (0..128).collect();
        let forwards = shuffle_list(input.clone(), 90, &test_seed(), true).unwrap();
        let inverted = shuffle_list(forwards, 90, &test_seed(), false).unwrap();
        assert_eq!(input, inverted);
    }

    #[test]
    fn different_seeds_disagree() {
        let input: Vec<usize> = (0..64).collect();
        let a = shuffle_list(input.clone(), 90, &test_seed(), true).unwrap();
        let b = shuffle_list(input, 90, &[43; SEED_SIZE], true).unwrap();
        assert_ne!(a, b);
    }
}
