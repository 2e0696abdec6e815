use super::errors::{BlockOperationError, IndexedAttestationInvalid as Invalid};
use super::VerifySignatures;
use bls::AggregateSignature;
use itertools::Itertools;
use types::{BeaconState, ChainSpec, Domain, EthSpec, IndexedAttestation, SignedRoot};

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Verify an `IndexedAttestation`.
pub fn is_valid_indexed_attestation<T: EthSpec>(
    state: &BeaconState<T>,
    indexed_attestation: &IndexedAttestation<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    // Verify that indices aren't empty.
    verify!(!indices.is_empty(), Invalid::IndicesEmpty);

    // Check that indices are sorted and unique.
    let check_sorted = |list: &[u64]| -> Result<()> {
        list.iter()
            .tuple_windows()
            .enumerate()
            .try_for_each(|(i, (x, y))| {
                if x < y {
                    Ok(())
                } else {
                    Err(error(Invalid::BadValidatorIndicesOrdering(i)))
                }
            })?;
        Ok(())
    };
    check_sorted(indices)?;

    // Every index must correspond to a known validator.
    for &index in indices.iter() {
        if state.get_validator(index as usize).is_err() {
            return Err(error(Invalid::UnknownValidator(index)));
        }
    }

    if verify_signatures.is_true() {
        let pubkeys = indices
            .iter()
            .map(|&index| {
                state
                    .get_validator(index as usize)
                    .ok()
                    .and_then(|v| v.pubkey.decompress().ok())
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| error(Invalid::SignatureSetError))?;
        let pubkey_refs = pubkeys.iter().collect::<Vec<_>>();

        let domain = spec.get_domain(
            indexed_attestation.data.target.epoch,
            Domain::BeaconAttester,
            &state.fork,
            state.genesis_validators_root,
        );
        let message = indexed_attestation.data.signing_root(domain);

        let signature = AggregateSignature::deserialize(&indexed_attestation.signature.serialize())
            .map_err(|_| error(Invalid::BadSignature))?;

        verify!(
            signature.fast_aggregate_verify(message, &pubkey_refs),
            Invalid::BadSignature
        );
    }

    Ok(())
}
