//! Unit tests of the epoch sub-transitions against hand-crafted states.

use state_processing::common::{decrease_balance, increase_balance};
use state_processing::per_epoch_processing::inactivity_updates::process_inactivity_updates;
use state_processing::per_epoch_processing::justification_and_finalization_state::JustificationAndFinalizationState;
use state_processing::per_epoch_processing::justification_and_finalization::weigh_justification_and_finalization;
use state_processing::per_epoch_processing::participation_cache::ParticipationCache;
use state_processing::per_epoch_processing::{
    process_effective_balance_updates, process_registry_updates, process_slashings,
};
use types::consts::TIMELY_TARGET_FLAG_INDEX;
use types::{
    BeaconState, ChainSpec, Checkpoint, Epoch, Eth1Data, EthSpec, Hash256, Keypair,
    MinimalEthSpec, Slot, Validator,
};

type E = MinimalEthSpec;

fn spec() -> ChainSpec {
    E::default_spec()
}

/// A state in the given epoch with `validator_count` active max-balance validators and a fully
/// distinct block-root history.
fn test_state(epoch: u64, validator_count: usize) -> BeaconState<E> {
    let spec = spec();
    let mut state = BeaconState::new(0, Eth1Data::default(), &spec);
    state.slot = Epoch::new(epoch).end_slot(E::slots_per_epoch());

    for i in 0..E::slots_per_historical_root() {
        state.block_roots[i] = Hash256::from_low_u64_be(i as u64 + 1);
    }

    for i in 0..validator_count {
        let keypair = Keypair::deterministic(i as u64);
        state
            .validators
            .push(Validator {
                pubkey: keypair.pk.compress(),
                withdrawal_credentials: Hash256::from_low_u64_be(i as u64),
                effective_balance: spec.max_effective_balance,
                slashed: false,
                activation_eligibility_epoch: Epoch::new(0),
                activation_epoch: Epoch::new(0),
                exit_epoch: spec.far_future_epoch,
                withdrawable_epoch: spec.far_future_epoch,
            })
            .unwrap();
        state.balances.push(spec.max_effective_balance).unwrap();
        state.previous_epoch_participation.push(Default::default()).unwrap();
        state.current_epoch_participation.push(Default::default()).unwrap();
        state.inactivity_scores.push(0).unwrap();
    }

    state
}

mod justification {
    use super::*;

    #[test]
    fn supermajority_justifies_previous_epoch() {
        let state = test_state(4, 16);
        let jf = JustificationAndFinalizationState::new(&state);

        // Exactly two thirds: 67 * 3 >= 100 * 2.
        let jf = weigh_justification_and_finalization(jf, 100, 67, 0).unwrap();

        assert_eq!(jf.current_justified_checkpoint().epoch, state.previous_epoch());
        assert!(jf.justification_bits().get(1).unwrap());
    }

    #[test]
    fn below_supermajority_does_not_justify() {
        let state = test_state(4, 16);
        let jf = JustificationAndFinalizationState::new(&state);
        let old_justified = jf.current_justified_checkpoint();

        // 66 * 3 < 100 * 2.
        let jf = weigh_justification_and_finalization(jf, 100, 66, 0).unwrap();

        assert_eq!(jf.current_justified_checkpoint(), old_justified);
        assert!(!jf.justification_bits().get(1).unwrap());
    }

    #[test]
    fn current_epoch_supermajority_justifies_current() {
        let state = test_state(4, 16);
        let jf = JustificationAndFinalizationState::new(&state);

        let jf = weigh_justification_and_finalization(jf, 100, 0, 80).unwrap();

        assert_eq!(jf.current_justified_checkpoint().epoch, state.current_epoch());
        assert!(jf.justification_bits().get(0).unwrap());
    }

    /// The "chain rule": the previous justified checkpoint finalizes when it is one epoch old
    /// and the two most recent epochs are justified.
    #[test]
    fn consecutive_justification_finalizes() {
        let mut state = test_state(4, 16);
        let current_epoch = state.current_epoch();

        // The previous epoch was already justified.
        state.current_justified_checkpoint = Checkpoint {
            epoch: current_epoch - 1u64,
            root: *state.get_block_root_at_epoch(current_epoch - 1u64).unwrap(),
        };
        state.justification_bits.set(0, true).unwrap();

        let jf = JustificationAndFinalizationState::new(&state);
        let jf = weigh_justification_and_finalization(jf, 100, 0, 80).unwrap();

        assert_eq!(jf.current_justified_checkpoint().epoch, current_epoch);
        assert_eq!(
            jf.finalized_checkpoint().epoch,
            current_epoch - 1u64,
            "the old current-justified checkpoint should finalize"
        );
    }

    /// The previous-justified checkpoint finalizes through the 2nd/3rd-bit rule even when the
    /// current epoch fails to justify.
    #[test]
    fn double_justification_without_current_epoch() {
        let mut state = test_state(4, 16);
        let current_epoch = state.current_epoch();

        // Epochs 2 and 3 justified in earlier runs.
        state.previous_justified_checkpoint = Checkpoint {
            epoch: current_epoch - 2u64,
            root: Hash256::repeat_byte(9),
        };
        state.current_justified_checkpoint = Checkpoint {
            epoch: current_epoch - 1u64,
            root: *state.get_block_root_at_epoch(current_epoch - 1u64).unwrap(),
        };
        state.justification_bits.set(0, true).unwrap();
        state.justification_bits.set(1, true).unwrap();

        let jf = JustificationAndFinalizationState::new(&state);
        // The previous epoch re-justifies; the current does not.
        let jf = weigh_justification_and_finalization(jf, 100, 80, 0).unwrap();

        assert_eq!(jf.current_justified_checkpoint().epoch, current_epoch - 1u64);
        assert_eq!(
            jf.finalized_checkpoint().epoch,
            current_epoch - 2u64,
            "the 2nd/3rd-bit rule should finalize the two-epoch-old checkpoint"
        );
    }
}

mod balances {
    use super::*;

    #[test]
    fn decrease_saturates_at_zero() {
        let mut state = test_state(0, 4);
        *state.get_balance_mut(0).unwrap() = 5;

        decrease_balance(&mut state, 0, 10).unwrap();
        assert_eq!(state.get_balance(0).unwrap(), 0);

        // Decrementing an empty balance stays at zero.
        decrease_balance(&mut state, 0, 1).unwrap();
        assert_eq!(state.get_balance(0).unwrap(), 0);
    }

    #[test]
    fn increase_overflow_is_an_error() {
        let mut state = test_state(0, 4);
        *state.get_balance_mut(0).unwrap() = u64::MAX;
        assert!(increase_balance(&mut state, 0, 1).is_err());
    }

    #[test]
    fn effective_balance_snaps_on_hysteresis_breach() {
        let spec = spec();
        let mut state = test_state(4, 4);

        // Validator 0 drops far below its effective balance.
        *state.get_balance_mut(0).unwrap() = 20_500_000_000;
        // Validator 1 drifts, but within the downward threshold of one quarter increment.
        *state.get_balance_mut(1).unwrap() = spec.max_effective_balance - 100_000_000;

        process_effective_balance_updates(&mut state, &spec).unwrap();

        assert_eq!(
            state.get_effective_balance(0).unwrap(),
            20_000_000_000,
            "effective balance should snap down to an increment multiple"
        );
        assert_eq!(
            state.get_effective_balance(1).unwrap(),
            spec.max_effective_balance,
            "a small drift should not move the effective balance"
        );
    }

    #[test]
    fn effective_balance_is_capped() {
        let spec = spec();
        let mut state = test_state(4, 4);

        *state.get_balance_mut(0).unwrap() = spec.max_effective_balance * 3;
        process_effective_balance_updates(&mut state, &spec).unwrap();

        assert_eq!(
            state.get_effective_balance(0).unwrap(),
            spec.max_effective_balance
        );
    }
}

mod registry {
    use super::*;

    #[test]
    fn new_validator_becomes_eligible() {
        let spec = spec();
        let mut state = test_state(4, 8);
        state.build_all_caches(&spec).unwrap();

        let fresh = Validator {
            activation_eligibility_epoch: spec.far_future_epoch,
            activation_epoch: spec.far_future_epoch,
            effective_balance: spec.max_effective_balance,
            ..Validator::default()
        };
        state.validators.push(fresh).unwrap();
        state.balances.push(spec.max_effective_balance).unwrap();
        state.previous_epoch_participation.push(Default::default()).unwrap();
        state.current_epoch_participation.push(Default::default()).unwrap();
        state.inactivity_scores.push(0).unwrap();

        process_registry_updates(&mut state, &spec).unwrap();

        let index = state.validators.len() - 1;
        assert_eq!(
            state.get_validator(index).unwrap().activation_eligibility_epoch,
            state.current_epoch() + 1u64
        );
    }

    #[test]
    fn low_balance_validator_is_ejected() {
        let spec = spec();
        let mut state = test_state(4, 8);
        state.build_all_caches(&spec).unwrap();

        state.get_validator_mut(3).unwrap().effective_balance = spec.ejection_balance;

        process_registry_updates(&mut state, &spec).unwrap();

        assert_ne!(
            state.get_validator(3).unwrap().exit_epoch,
            spec.far_future_epoch,
            "ejected validator should have an exit epoch"
        );
    }
}

mod slashing_penalties {
    use super::*;

    #[test]
    fn penalty_applies_at_the_halfway_epoch() {
        let spec = spec();
        let mut state = test_state(8, 8);
        let current_epoch = state.current_epoch();
        let total_balance = 8 * spec.max_effective_balance;

        // Validator 2 was slashed; its withdrawable epoch sits exactly half a slashings vector
        // ahead.
        let halfway = current_epoch + (E::epochs_per_slashings_vector() as u64 / 2);
        {
            let validator = state.get_validator_mut(2).unwrap();
            validator.slashed = true;
            validator.withdrawable_epoch = halfway;
        }
        state.set_slashings_at(current_epoch, spec.max_effective_balance).unwrap();

        let balance_before = state.get_balance(2).unwrap();
        process_slashings(&mut state, total_balance, &spec).unwrap();
        let balance_after = state.get_balance(2).unwrap();

        let expected_penalty = {
            let adjusted = std::cmp::min(
                spec.max_effective_balance * spec.proportional_slashing_multiplier,
                total_balance,
            );
            let increment = spec.effective_balance_increment;
            spec.max_effective_balance / increment * adjusted / total_balance * increment
        };

        assert_eq!(balance_before - balance_after, expected_penalty);
        assert!(expected_penalty > 0);
    }

    #[test]
    fn no_penalty_off_the_boundary() {
        let spec = spec();
        let mut state = test_state(8, 8);
        let current_epoch = state.current_epoch();

        let validator = state.get_validator_mut(2).unwrap();
        validator.slashed = true;
        validator.withdrawable_epoch = current_epoch + 3u64;

        let balance_before = state.get_balance(2).unwrap();
        process_slashings(&mut state, 8 * spec.max_effective_balance, &spec).unwrap();
        assert_eq!(state.get_balance(2).unwrap(), balance_before);
    }
}

mod inactivity {
    use super::*;

    #[test]
    fn attesters_recover_and_absentees_accrue() {
        let spec = spec();
        let mut state = test_state(4, 8);

        // Validator 0 hit the target last epoch; validator 1 did not. Both start with a score.
        *state.get_inactivity_score_mut(0).unwrap() = 10;
        *state.get_inactivity_score_mut(1).unwrap() = 100;
        state
            .previous_epoch_participation
            .get_mut(0)
            .unwrap()
            .add_flag(TIMELY_TARGET_FLAG_INDEX)
            .unwrap();

        // Finality is current, so no leak is in progress.
        state.finalized_checkpoint.epoch = state.previous_epoch() - 1u64;

        let cache = ParticipationCache::new(&state, &spec).unwrap();
        process_inactivity_updates(&mut state, &cache, &spec).unwrap();

        // Attester: -1 then the recovery rate, saturating at zero.
        assert_eq!(state.get_inactivity_score(0).unwrap(), 0);
        // Absentee: +bias then -recovery.
        assert_eq!(
            state.get_inactivity_score(1).unwrap(),
            100 + spec.inactivity_score_bias - spec.inactivity_score_recovery_rate
        );
    }
}

#[test]
fn slot_advance_rejects_backwards_targets() {
    let spec = spec();
    let mut state = test_state(2, 4);
    let slot = state.slot;

    let result = state_processing::complete_state_advance(
        &mut state,
        None,
        slot - 1u64,
        &spec,
    );
    assert!(result.is_err());
    assert_eq!(state.slot, slot, "state should be untouched on error");
}
