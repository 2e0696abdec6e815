use super::errors::{BlockOperationError, ProposerSlashingInvalid as Invalid};
use super::VerifySignatures;
use types::{
    BeaconState, ChainSpec, Domain, EthSpec, ProposerSlashing, SignedBeaconBlockHeader, SignedRoot,
};

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Verify a `ProposerSlashing` is valid to be included in the current state.
pub fn verify_proposer_slashing<T: EthSpec>(
    proposer_slashing: &ProposerSlashing,
    state: &BeaconState<T>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<()> {
    let header_1 = &proposer_slashing.signed_header_1.message;
    let header_2 = &proposer_slashing.signed_header_2.message;

    verify!(
        header_1.slot == header_2.slot,
        Invalid::ProposalSlotMismatch(header_1.slot, header_2.slot)
    );
    verify!(
        header_1.proposer_index == header_2.proposer_index,
        Invalid::ProposerIndexMismatch(header_1.proposer_index, header_2.proposer_index)
    );
    verify!(header_1 != header_2, Invalid::ProposalsIdentical);

    let proposer = state
        .get_validator(header_1.proposer_index as usize)
        .map_err(|_| error(Invalid::ProposerUnknown(header_1.proposer_index)))?;

    verify!(
        proposer.is_slashable_at(state.current_epoch()),
        Invalid::ProposerNotSlashable(header_1.proposer_index)
    );

    if verify_signatures.is_true() {
        let pubkey = proposer
            .pubkey
            .decompress()
            .map_err(|_| error(Invalid::BadProposal1Signature))?;

        let verify_header = |signed_header: &SignedBeaconBlockHeader,
                             reason: Invalid|
         -> Result<()> {
            let domain = spec.get_domain(
                signed_header.message.slot.epoch(T::slots_per_epoch()),
                Domain::BeaconProposer,
                &state.fork,
                state.genesis_validators_root,
            );
            let message = signed_header.message.signing_root(domain);
            let signature = signed_header
                .signature
                .decompress()
                .map_err(|_| error(reason.clone()))?;
            verify!(signature.verify(&pubkey, message), reason);
            Ok(())
        };

        verify_header(
            &proposer_slashing.signed_header_1,
            Invalid::BadProposal1Signature,
        )?;
        verify_header(
            &proposer_slashing.signed_header_2,
            Invalid::BadProposal2Signature,
        )?;
    }

    Ok(())
}
