use crate::{Epoch, Fork, ForkData, Hash256, Slot};
use serde_derive::{Deserialize, Serialize};
use tree_hash::TreeHash;

/// The signature domains, one per signed object kind.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Domain {
    BeaconProposer,
    BeaconAttester,
    Randao,
    Deposit,
    VoluntaryExit,
    SelectionProof,
    AggregateAndProof,
    SyncCommittee,
    SyncCommitteeSelectionProof,
    ContributionAndProof,
}

/// Holds all the "constants" for a beacon chain network.
///
/// Constructed as an immutable descriptor at startup and passed by reference through every core
/// entry point; there is no process-wide configuration singleton.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ChainSpec {
    /*
     * Constants
     */
    pub far_future_epoch: Epoch,
    pub genesis_slot: Slot,

    /*
     * Misc
     */
    pub max_committees_per_slot: usize,
    pub target_committee_size: usize,
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,
    pub shuffle_round_count: u8,
    pub min_genesis_active_validator_count: u64,
    pub min_genesis_time: u64,
    pub hysteresis_quotient: u64,
    pub hysteresis_downward_multiplier: u64,
    pub hysteresis_upward_multiplier: u64,

    /*
     * Gwei values
     */
    pub min_deposit_amount: u64,
    pub max_effective_balance: u64,
    pub ejection_balance: u64,
    pub effective_balance_increment: u64,

    /*
     * Initial values
     */
    pub genesis_fork_version: [u8; 4],
    pub bls_withdrawal_prefix_byte: u8,

    /*
     * Time parameters
     */
    pub genesis_delay: u64,
    pub seconds_per_slot: u64,
    pub min_attestation_inclusion_delay: u64,
    pub min_seed_lookahead: Epoch,
    pub max_seed_lookahead: Epoch,
    pub min_epochs_to_inactivity_penalty: u64,
    pub min_validator_withdrawability_delay: Epoch,
    pub shard_committee_period: u64,

    /*
     * Reward and penalty quotients
     */
    pub base_reward_factor: u64,
    pub inactivity_penalty_quotient: u64,
    pub min_slashing_penalty_quotient: u64,
    pub proportional_slashing_multiplier: u64,
    pub whistleblower_reward_quotient: u64,
    pub inactivity_score_bias: u64,
    pub inactivity_score_recovery_rate: u64,

    /*
     * Sync committees
     */
    pub epochs_per_sync_committee_period: Epoch,

    /*
     * Signature domains
     */
    pub(crate) domain_beacon_proposer: u32,
    pub(crate) domain_beacon_attester: u32,
    pub(crate) domain_randao: u32,
    pub(crate) domain_deposit: u32,
    pub(crate) domain_voluntary_exit: u32,
    pub(crate) domain_selection_proof: u32,
    pub(crate) domain_aggregate_and_proof: u32,
    pub(crate) domain_sync_committee: u32,
    pub(crate) domain_sync_committee_selection_proof: u32,
    pub(crate) domain_contribution_and_proof: u32,
}

impl ChainSpec {
    /// Get the domain number, unmodified by the fork.
    ///
    /// Spec v0.12.1
    pub fn get_domain_constant(&self, domain: Domain) -> u32 {
        match domain {
            Domain::BeaconProposer => self.domain_beacon_proposer,
            Domain::BeaconAttester => self.domain_beacon_attester,
            Domain::Randao => self.domain_randao,
            Domain::Deposit => self.domain_deposit,
            Domain::VoluntaryExit => self.domain_voluntary_exit,
            Domain::SelectionProof => self.domain_selection_proof,
            Domain::AggregateAndProof => self.domain_aggregate_and_proof,
            Domain::SyncCommittee => self.domain_sync_committee,
            Domain::SyncCommitteeSelectionProof => self.domain_sync_committee_selection_proof,
            Domain::ContributionAndProof => self.domain_contribution_and_proof,
        }
    }

    /// Get the domain that represents the fork meta and signature domain.
    pub fn get_domain(
        &self,
        epoch: Epoch,
        domain: Domain,
        fork: &Fork,
        genesis_validators_root: Hash256,
    ) -> Hash256 {
        let fork_version = fork.get_fork_version(epoch);
        self.compute_domain(domain, fork_version, genesis_validators_root)
    }

    /// Get the domain for a deposit signature.
    ///
    /// Deposits are valid across forks, thus the deposit domain is computed
    /// with the genesis fork version.
    pub fn get_deposit_domain(&self) -> Hash256 {
        self.compute_domain(Domain::Deposit, self.genesis_fork_version, Hash256::zero())
    }

    /// Compute a domain by applying the given `fork_version`.
    pub fn compute_domain(
        &self,
        domain: Domain,
        fork_version: [u8; 4],
        genesis_validators_root: Hash256,
    ) -> Hash256 {
        let domain_constant = self.get_domain_constant(domain);

        let mut domain = [0; 32];
        domain[0..4].copy_from_slice(&domain_constant.to_le_bytes());
        domain[4..].copy_from_slice(
            ForkData {
                current_version: fork_version,
                genesis_validators_root,
            }
            .tree_hash_root()
            .as_bytes()
            .get(..28)
            .expect("fork has is 32 bytes so first 28 bytes should exist"),
        );

        Hash256::from(domain)
    }

    /// Returns the minimum epoch at which a validator that exits at `epoch` may withdraw.
    pub fn withdrawable_epoch(&self, exit_epoch: Epoch) -> Epoch {
        exit_epoch + self.min_validator_withdrawability_delay
    }

    /// Returns a `ChainSpec` compatible with the Ethereum Foundation mainnet specification.
    pub fn mainnet() -> Self {
        Self {
            /*
             * Constants
             */
            far_future_epoch: Epoch::new(u64::MAX),
            genesis_slot: Slot::new(0),

            /*
             * Misc
             */
            max_committees_per_slot: 64,
            target_committee_size: 128,
            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 65_536,
            shuffle_round_count: 90,
            min_genesis_active_validator_count: 16_384,
            min_genesis_time: 1_606_824_000, // Dec 1, 2020
            hysteresis_quotient: 4,
            hysteresis_downward_multiplier: 1,
            hysteresis_upward_multiplier: 5,

            /*
             * Gwei values
             */
            min_deposit_amount: u64::pow(2, 0).saturating_mul(u64::pow(10, 9)),
            max_effective_balance: u64::pow(2, 5).saturating_mul(u64::pow(10, 9)),
            ejection_balance: u64::pow(2, 4).saturating_mul(u64::pow(10, 9)),
            effective_balance_increment: u64::pow(2, 0).saturating_mul(u64::pow(10, 9)),

            /*
             * Initial values
             */
            genesis_fork_version: [0; 4],
            bls_withdrawal_prefix_byte: 0x00,

            /*
             * Time parameters
             */
            genesis_delay: 604_800, // 7 days
            seconds_per_slot: 12,
            min_attestation_inclusion_delay: 1,
            min_seed_lookahead: Epoch::new(1),
            max_seed_lookahead: Epoch::new(4),
            min_epochs_to_inactivity_penalty: 4,
            min_validator_withdrawability_delay: Epoch::new(256),
            shard_committee_period: 256,

            /*
             * Reward and penalty quotients
             */
            base_reward_factor: 64,
            inactivity_penalty_quotient: u64::pow(2, 24),
            min_slashing_penalty_quotient: 32,
            proportional_slashing_multiplier: 3,
            whistleblower_reward_quotient: 512,
            inactivity_score_bias: 4,
            inactivity_score_recovery_rate: 16,

            /*
             * Sync committees
             */
            epochs_per_sync_committee_period: Epoch::new(256),

            /*
             * Signature domains
             */
            domain_beacon_proposer: 0,
            domain_beacon_attester: 1,
            domain_randao: 2,
            domain_deposit: 3,
            domain_voluntary_exit: 4,
            domain_selection_proof: 5,
            domain_aggregate_and_proof: 6,
            domain_sync_committee: 7,
            domain_sync_committee_selection_proof: 8,
            domain_contribution_and_proof: 9,
        }
    }

    /// Returns a `ChainSpec` compatible with the specification suitable for 8-validator testing.
    pub fn minimal() -> Self {
        Self {
            max_committees_per_slot: 4,
            target_committee_size: 4,
            churn_limit_quotient: 32,
            shuffle_round_count: 10,
            min_genesis_active_validator_count: 64,
            min_genesis_time: 1_578_009_600,
            genesis_delay: 300,
            seconds_per_slot: 6,
            min_validator_withdrawability_delay: Epoch::new(256),
            shard_committee_period: 64,
            epochs_per_sync_committee_period: Epoch::new(8),
            ..ChainSpec::mainnet()
        }
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EthSpec, MainnetEthSpec};

    #[test]
    fn test_get_domain() {
        let spec = ChainSpec::mainnet();
        let fork = Fork {
            previous_version: spec.genesis_fork_version,
            current_version: spec.genesis_fork_version,
            epoch: Epoch::new(0),
        };

        let domain = spec.get_domain(
            Epoch::new(0),
            Domain::BeaconProposer,
            &fork,
            Hash256::zero(),
        );

        // The first four bytes are the little-endian domain constant.
        assert_eq!(
            &domain.as_bytes()[0..4],
            &spec.domain_beacon_proposer.to_le_bytes()
        );
    }

    #[test]
    fn different_domains_disagree() {
        let spec = ChainSpec::mainnet();
        let fork = Fork::default();
        let a = spec.get_domain(Epoch::new(0), Domain::BeaconProposer, &fork, Hash256::zero());
        let b = spec.get_domain(Epoch::new(0), Domain::BeaconAttester, &fork, Hash256::zero());
        assert_ne!(a, b);
    }

    #[test]
    fn mainnet_spec_matches_preset() {
        let spec = MainnetEthSpec::default_spec();
        assert_eq!(spec.max_effective_balance, 32_000_000_000);
        assert_eq!(spec.effective_balance_increment, 1_000_000_000);
        assert_eq!(spec.ejection_balance, 16_000_000_000);
    }
}
