use types::{BeaconStateError, BitList, EthSpec};

/// Returns validator indices which participated in the attestation, sorted by increasing index.
pub fn get_attesting_indices<T: EthSpec>(
    committee: &[usize],
    bitlist: &BitList<T::MaxValidatorsPerCommittee>,
) -> Result<Vec<u64>, BeaconStateError> {
    if bitlist.len() != committee.len() {
        return Err(BeaconStateError::InvalidBitfield);
    }

    let mut indices = Vec::with_capacity(bitlist.num_set_bits());
    for (i, &validator_index) in committee.iter().enumerate() {
        if bitlist.get(i).map_err(|_| BeaconStateError::InvalidBitfield)? {
            indices.push(validator_index as u64);
        }
    }

    indices.sort_unstable();
    Ok(indices)
}
