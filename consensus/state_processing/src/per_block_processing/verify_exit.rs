use super::errors::{BlockOperationError, ExitInvalid as Invalid};
use super::VerifySignatures;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, Domain, EthSpec, SignedRoot, SignedVoluntaryExit};

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Verify a `SignedVoluntaryExit` is valid to be included in the current state.
pub fn verify_exit<T: EthSpec>(
    state: &BeaconState<T>,
    signed_exit: &SignedVoluntaryExit,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<()> {
    verify_exit_parametric(state, signed_exit, verify_signatures, spec, false)
}

/// Verify an exit deferring the epoch check, for use in the operation pool where future exits
/// may become valid.
pub fn verify_exit_time_independent_only<T: EthSpec>(
    state: &BeaconState<T>,
    signed_exit: &SignedVoluntaryExit,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<()> {
    verify_exit_parametric(state, signed_exit, verify_signatures, spec, true)
}

fn verify_exit_parametric<T: EthSpec>(
    state: &BeaconState<T>,
    signed_exit: &SignedVoluntaryExit,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
    time_independent_only: bool,
) -> Result<()> {
    let exit = &signed_exit.message;

    let validator = state
        .get_validator(exit.validator_index as usize)
        .map_err(|_| error(Invalid::ValidatorUnknown(exit.validator_index)))?;

    // Verify the validator is active.
    verify!(
        validator.is_active_at(state.current_epoch()),
        Invalid::NotActive(exit.validator_index)
    );

    // Verify that the validator has not yet exited.
    verify!(
        validator.exit_epoch == spec.far_future_epoch,
        Invalid::AlreadyExited(exit.validator_index)
    );

    // Exits must specify an epoch, when they become valid; they are not valid before then.
    verify!(
        time_independent_only || state.current_epoch() >= exit.epoch,
        Invalid::FutureEpoch {
            state: state.current_epoch(),
            exit: exit.epoch,
        }
    );

    // Verify the validator has been active long enough.
    let earliest_exit_epoch = validator
        .activation_epoch
        .safe_add(spec.shard_committee_period)?;
    verify!(
        state.current_epoch() >= earliest_exit_epoch,
        Invalid::TooYoungToExit {
            current_epoch: state.current_epoch(),
            earliest_exit_epoch,
        }
    );

    if verify_signatures.is_true() {
        let pubkey = validator
            .pubkey
            .decompress()
            .map_err(|_| error(Invalid::BadSignature))?;
        let domain = spec.get_domain(
            exit.epoch,
            Domain::VoluntaryExit,
            &state.fork,
            state.genesis_validators_root,
        );
        let message = exit.signing_root(domain);
        let signature = signed_exit
            .signature
            .decompress()
            .map_err(|_| error(Invalid::BadSignature))?;
        verify!(signature.verify(&pubkey, message), Invalid::BadSignature);
    }

    Ok(())
}
