#![cfg(test)]
use crate::{
    BeaconState, BeaconStateError as Error, ChainSpec, Epoch, Eth1Data, EthSpec, Hash256,
    Keypair, MinimalEthSpec, RelativeEpoch, Slot, Validator,
};
use std::collections::HashSet;

type E = MinimalEthSpec;

fn test_state(validator_count: usize) -> (BeaconState<E>, ChainSpec) {
    let spec = E::default_spec();
    let mut state = BeaconState::new(0, Eth1Data::default(), &spec);

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
        state
            .previous_epoch_participation
            .push(Default::default())
            .unwrap();
        state
            .current_epoch_participation
            .push(Default::default())
            .unwrap();
        state.inactivity_scores.push(0).unwrap();
    }

    (state, spec)
}

#[test]
fn registry_vectors_stay_parallel() {
    let (state, _) = test_state(16);
    assert_eq!(state.validators.len(), state.balances.len());
    assert_eq!(
        state.validators.len(),
        state.current_epoch_participation.len()
    );
    assert_eq!(
        state.validators.len(),
        state.previous_epoch_participation.len()
    );
}

#[test]
fn committee_cache_rebuild_is_identical() {
    let (mut state, spec) = test_state(16);
    state.build_committee_cache(RelativeEpoch::Current, &spec).unwrap();

    let first = state.committee_cache(RelativeEpoch::Current).unwrap().clone();
    state
        .force_build_committee_cache(RelativeEpoch::Current, &spec)
        .unwrap();
    let second = state.committee_cache(RelativeEpoch::Current).unwrap().clone();

    assert_eq!(*first, *second);
}

#[test]
fn every_active_validator_attests_once_per_epoch() {
    let (mut state, spec) = test_state(16);
    state.build_committee_cache(RelativeEpoch::Current, &spec).unwrap();

    let mut seen = HashSet::new();
    for slot in state.current_epoch().slot_iter(E::slots_per_epoch()) {
        let committees_at_slot = state.get_committee_count_at_slot(slot).unwrap();
        for index in 0..committees_at_slot {
            let committee = state.get_beacon_committee(slot, index).unwrap();
            for &validator_index in committee.committee {
                assert!(
                    seen.insert(validator_index),
                    "validator {} assigned twice",
                    validator_index
                );
            }
        }
    }
    assert_eq!(seen.len(), 16);
}

#[test]
fn proposer_index_is_deterministic() {
    let (state, spec) = test_state(16);
    let slot = Slot::new(3);
    let a = state.get_beacon_proposer_index(slot, &spec).unwrap();
    let b = state.get_beacon_proposer_index(slot, &spec).unwrap();
    assert_eq!(a, b);
    assert!(a < 16);
}

#[test]
fn block_roots_bounds() {
    let (mut state, _) = test_state(4);
    state.slot = Slot::new(10);

    assert!(state.get_block_root(Slot::new(9)).is_ok());
    assert_eq!(
        state.get_block_root(Slot::new(10)),
        Err(Error::SlotOutOfBounds)
    );
    assert_eq!(
        state.get_block_root(Slot::new(11)),
        Err(Error::SlotOutOfBounds)
    );
}

#[test]
fn tree_hash_tracks_balance_changes() {
    let (mut state, _) = test_state(8);
    let before = state.canonical_root();
    *state.get_balance_mut(0).unwrap() += 1;
    assert_ne!(before, state.canonical_root());
}

#[test]
fn caches_do_not_affect_tree_hash() {
    let (mut state, spec) = test_state(8);
    let before = state.canonical_root();
    state.build_all_caches(&spec).unwrap();
    assert_eq!(before, state.canonical_root());
}

#[test]
fn total_balance_floors_at_one_increment() {
    let (state, spec) = test_state(4);
    assert_eq!(
        state.get_total_balance(&[], &spec).unwrap(),
        spec.effective_balance_increment
    );
}

#[test]
fn pubkey_cache_covers_registry() {
    let (mut state, _) = test_state(8);
    state.update_pubkey_cache().unwrap();
    let pubkey = state.validators[5].pubkey;
    assert_eq!(state.get_validator_index(&pubkey).unwrap(), Some(5));
}

#[test]
fn ssz_round_trip_preserves_root() {
    use ssz::{Decode, Encode};
    let (mut state, spec) = test_state(8);
    state.build_all_caches(&spec).unwrap();

    let bytes = state.as_ssz_bytes();
    let decoded = BeaconState::<E>::from_ssz_bytes(&bytes).unwrap();

    assert_eq!(decoded.canonical_root(), state.canonical_root());
    assert_eq!(decoded.validators.len(), state.validators.len());
}
