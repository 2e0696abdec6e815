use crate::{
    AttestationDuty, BeaconBlockHeader, BeaconCommittee, ChainSpec, Checkpoint, Domain, Epoch,
    Eth1Data, EthSpec, ExecutionPayloadHeader, Fork, Hash256, ParticipationFlags, PublicKeyBytes,
    RelativeEpoch, RelativeEpochError, Slot, SyncCommittee, Validator,
};
use bls::AggregatePublicKey;
use ethereum_hashing::hash;
use safe_arith::{ArithError, SafeArith};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{BitVector, FixedVector, VariableList};
use std::sync::Arc;
use swap_or_not_shuffle::compute_shuffled_index;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

pub use self::committee_cache::CommitteeCache;
pub use self::pubkey_cache::PubkeyCache;

mod committee_cache;
mod pubkey_cache;

#[cfg(test)]
mod tests;

pub const CACHED_EPOCHS: usize = 3;

const MAX_RANDOM_BYTE: u64 = u8::MAX as u64;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    EpochOutOfBounds,
    SlotOutOfBounds,
    UnknownValidator(usize),
    UnableToDetermineProducer,
    UnableToShuffle,
    ShuffleIndexOutOfBounds(usize),
    ParticipationOutOfBounds(usize),
    InactivityScoresOutOfBounds(usize),
    BalancesOutOfBounds(usize),
    InsufficientValidators,
    InvalidBitfield,
    NoCommittee { slot: Slot, index: u64 },
    CommitteeCacheUninitialized(Option<RelativeEpoch>),
    TotalActiveBalanceCacheUninitialized,
    TotalActiveBalanceDiffersFromCache { cached: u64, computed: u64 },
    PubkeyCacheInconsistent,
    RelativeEpochError(RelativeEpochError),
    SszTypesError(ssz_types::Error),
    ArithError(ArithError),
}

impl From<RelativeEpochError> for Error {
    fn from(e: RelativeEpochError) -> Error {
        Error::RelativeEpochError(e)
    }
}

impl From<ssz_types::Error> for Error {
    fn from(e: ssz_types::Error) -> Error {
        Error::SszTypesError(e)
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Error {
        Error::ArithError(e)
    }
}

/// The state of the `BeaconChain` at some slot.
///
/// The trailing cache fields are not part of the consensus object: they are skipped by SSZ,
/// tree hashing and serde serialization, and rebuilding any of them from the preceding fields
/// always reproduces the cached value.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "T: EthSpec")]
pub struct BeaconState<T: EthSpec> {
    // Versioning
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: Hash256,
    pub slot: Slot,
    pub fork: Fork,

    // History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: FixedVector<Hash256, T::SlotsPerHistoricalRoot>,
    pub state_roots: FixedVector<Hash256, T::SlotsPerHistoricalRoot>,
    pub historical_roots: VariableList<Hash256, T::HistoricalRootsLimit>,

    // Ethereum 1.0 chain data
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: VariableList<Eth1Data, T::SlotsPerEth1VotingPeriod>,
    #[serde(with = "serde_utils::quoted_u64")]
    pub eth1_deposit_index: u64,

    // Registry
    pub validators: VariableList<Validator, T::ValidatorRegistryLimit>,
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub balances: VariableList<u64, T::ValidatorRegistryLimit>,

    // Randomness
    pub randao_mixes: FixedVector<Hash256, T::EpochsPerHistoricalVector>,

    // Slashings
    #[serde(with = "ssz_types::serde_utils::quoted_u64_fixed_vec")]
    pub slashings: FixedVector<u64, T::EpochsPerSlashingsVector>,

    // Participation
    pub previous_epoch_participation: VariableList<ParticipationFlags, T::ValidatorRegistryLimit>,
    pub current_epoch_participation: VariableList<ParticipationFlags, T::ValidatorRegistryLimit>,

    // Finality
    pub justification_bits: BitVector<T::JustificationBitsLength>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    // Inactivity
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub inactivity_scores: VariableList<u64, T::ValidatorRegistryLimit>,

    // Light-client sync committees
    pub current_sync_committee: Arc<SyncCommittee<T>>,
    pub next_sync_committee: Arc<SyncCommittee<T>>,

    // Execution
    pub latest_execution_payload_header: ExecutionPayloadHeader<T>,

    // Caching (not in the spec)
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub committee_caches: [Arc<CommitteeCache>; CACHED_EPOCHS],
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub pubkey_cache: PubkeyCache,
    #[serde(skip_serializing, skip_deserializing)]
    #[ssz(skip_serializing, skip_deserializing)]
    #[tree_hash(skip_hashing)]
    pub total_active_balance: Option<(Epoch, u64)>,
}

impl<T: EthSpec> BeaconState<T> {
    /// Create a new state at genesis with empty registry and placeholder sync committees.
    pub fn new(genesis_time: u64, eth1_data: Eth1Data, spec: &ChainSpec) -> Self {
        BeaconState {
            genesis_time,
            genesis_validators_root: Hash256::zero(),
            slot: spec.genesis_slot,
            fork: Fork {
                previous_version: spec.genesis_fork_version,
                current_version: spec.genesis_fork_version,
                epoch: Epoch::new(0),
            },

            latest_block_header: BeaconBlockHeader::default(),
            block_roots: FixedVector::from_elem(Hash256::zero()),
            state_roots: FixedVector::from_elem(Hash256::zero()),
            historical_roots: VariableList::empty(),

            eth1_data,
            eth1_data_votes: VariableList::empty(),
            eth1_deposit_index: 0,

            validators: VariableList::empty(),
            balances: VariableList::empty(),

            randao_mixes: FixedVector::from_elem(Hash256::zero()),

            slashings: FixedVector::from_elem(0),

            previous_epoch_participation: VariableList::empty(),
            current_epoch_participation: VariableList::empty(),

            justification_bits: BitVector::new(),
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),

            inactivity_scores: VariableList::empty(),

            current_sync_committee: Arc::new(SyncCommittee::temporary()),
            next_sync_committee: Arc::new(SyncCommittee::temporary()),

            latest_execution_payload_header: ExecutionPayloadHeader::default(),

            committee_caches: [
                Arc::new(CommitteeCache::default()),
                Arc::new(CommitteeCache::default()),
                Arc::new(CommitteeCache::default()),
            ],
            pubkey_cache: PubkeyCache::default(),
            total_active_balance: None,
        }
    }

    /// Returns the `tree_hash_root` of the state.
    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }

    /*
     * Epoch accessors
     */

    /// The epoch corresponding to `self.slot`.
    pub fn current_epoch(&self) -> Epoch {
        self.slot.epoch(T::slots_per_epoch())
    }

    /// The epoch prior to `self.current_epoch()`, saturating at genesis.
    pub fn previous_epoch(&self) -> Epoch {
        let current_epoch = self.current_epoch();
        if current_epoch > 0 {
            current_epoch - 1u64
        } else {
            current_epoch
        }
    }

    /// The epoch following `self.current_epoch()`.
    pub fn next_epoch(&self) -> Epoch {
        self.current_epoch() + 1u64
    }

    /*
     * Registry accessors
     */

    pub fn get_validator(&self, validator_index: usize) -> Result<&Validator, Error> {
        self.validators
            .get(validator_index)
            .ok_or(Error::UnknownValidator(validator_index))
    }

    pub fn get_validator_mut(&mut self, validator_index: usize) -> Result<&mut Validator, Error> {
        self.validators
            .get_mut(validator_index)
            .ok_or(Error::UnknownValidator(validator_index))
    }

    pub fn get_effective_balance(&self, validator_index: usize) -> Result<u64, Error> {
        self.get_validator(validator_index)
            .map(|v| v.effective_balance)
    }

    pub fn get_balance(&self, validator_index: usize) -> Result<u64, Error> {
        self.balances
            .get(validator_index)
            .copied()
            .ok_or(Error::BalancesOutOfBounds(validator_index))
    }

    pub fn get_balance_mut(&mut self, validator_index: usize) -> Result<&mut u64, Error> {
        self.balances
            .get_mut(validator_index)
            .ok_or(Error::BalancesOutOfBounds(validator_index))
    }

    pub fn get_inactivity_score(&self, validator_index: usize) -> Result<u64, Error> {
        self.inactivity_scores
            .get(validator_index)
            .copied()
            .ok_or(Error::InactivityScoresOutOfBounds(validator_index))
    }

    pub fn get_inactivity_score_mut(&mut self, validator_index: usize) -> Result<&mut u64, Error> {
        self.inactivity_scores
            .get_mut(validator_index)
            .ok_or(Error::InactivityScoresOutOfBounds(validator_index))
    }

    /// The indices of all validators active in the given epoch, ascending.
    pub fn get_active_validator_indices(&self, epoch: Epoch) -> Vec<usize> {
        self.validators
            .iter()
            .enumerate()
            .filter(|(_, validator)| validator.is_active_at(epoch))
            .map(|(index, _)| index)
            .collect()
    }

    /// Looks up the registry index of a public key via the pubkey cache.
    ///
    /// The cache must cover the whole registry (see `update_pubkey_cache`).
    pub fn get_validator_index(&self, pubkey: &PublicKeyBytes) -> Result<Option<usize>, Error> {
        if self.pubkey_cache.len() != self.validators.len() {
            return Err(Error::PubkeyCacheInconsistent);
        }
        Ok(self.pubkey_cache.get(pubkey))
    }

    /// The churn limit for the current epoch.
    pub fn get_churn_limit(&self, spec: &ChainSpec) -> Result<u64, Error> {
        Ok(std::cmp::max(
            spec.min_per_epoch_churn_limit,
            (self
                .committee_cache(RelativeEpoch::Current)?
                .active_validator_count() as u64)
                .safe_div(spec.churn_limit_quotient)?,
        ))
    }

    /*
     * Block and state roots
     */

    fn get_latest_block_roots_index(&self, slot: Slot) -> Result<usize, Error> {
        if slot < self.slot && self.slot <= slot + T::slots_per_historical_root() as u64 {
            Ok(slot.as_usize().safe_rem(T::slots_per_historical_root())?)
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    /// Return the block root at a recent `slot`.
    pub fn get_block_root(&self, slot: Slot) -> Result<&Hash256, Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        self.block_roots.get(i).ok_or(Error::SlotOutOfBounds)
    }

    /// Return the block root at a recent `epoch`'s starting slot.
    pub fn get_block_root_at_epoch(&self, epoch: Epoch) -> Result<&Hash256, Error> {
        self.get_block_root(epoch.start_slot(T::slots_per_epoch()))
    }

    pub fn set_block_root(&mut self, slot: Slot, block_root: Hash256) -> Result<(), Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        *self.block_roots.get_mut(i).ok_or(Error::SlotOutOfBounds)? = block_root;
        Ok(())
    }

    /// Return the state root at a recent `slot`.
    pub fn get_state_root(&self, slot: Slot) -> Result<&Hash256, Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        self.state_roots.get(i).ok_or(Error::SlotOutOfBounds)
    }

    pub fn set_state_root(&mut self, slot: Slot, state_root: Hash256) -> Result<(), Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        *self.state_roots.get_mut(i).ok_or(Error::SlotOutOfBounds)? = state_root;
        Ok(())
    }

    /*
     * Randao
     */

    /// Return the randao mix at a recent `epoch`.
    pub fn get_randao_mix(&self, epoch: Epoch) -> Result<&Hash256, Error> {
        let i = epoch
            .as_usize()
            .safe_rem(T::epochs_per_historical_vector())?;
        self.randao_mixes.get(i).ok_or(Error::EpochOutOfBounds)
    }

    /// XOR a new randao reveal hash into the mix for `epoch`.
    pub fn update_randao_mix(&mut self, epoch: Epoch, signature_hash: Hash256) -> Result<(), Error> {
        let i = epoch
            .as_usize()
            .safe_rem(T::epochs_per_historical_vector())?;

        let current_mix = *self.get_randao_mix(self.current_epoch())?;
        let new_mix = Hash256::from_slice(
            &current_mix
                .as_bytes()
                .iter()
                .zip(signature_hash.as_bytes())
                .map(|(a, b)| a ^ b)
                .collect::<Vec<u8>>(),
        );

        *self.randao_mixes.get_mut(i).ok_or(Error::EpochOutOfBounds)? = new_mix;
        Ok(())
    }

    /// Directly set the randao mix for `epoch` (used by epoch processing to advance the
    /// accumulator).
    pub fn set_randao_mix(&mut self, epoch: Epoch, mix: Hash256) -> Result<(), Error> {
        let i = epoch
            .as_usize()
            .safe_rem(T::epochs_per_historical_vector())?;
        *self.randao_mixes.get_mut(i).ok_or(Error::EpochOutOfBounds)? = mix;
        Ok(())
    }

    /// Generate a seed for the given `epoch` and signature domain.
    pub fn get_seed(
        &self,
        epoch: Epoch,
        domain_type: Domain,
        spec: &ChainSpec,
    ) -> Result<Hash256, Error> {
        // Bypass the safe getter for the randao mix: the index is "wrapped" around the epoch
        // window by construction.
        let mix = {
            let i = epoch
                .safe_add(T::epochs_per_historical_vector() as u64)?
                .safe_sub(spec.min_seed_lookahead.as_u64())?
                .safe_sub(1u64)?;
            let i_mod = i.as_usize().safe_rem(T::epochs_per_historical_vector())?;
            self.randao_mixes.get(i_mod).ok_or(Error::EpochOutOfBounds)?
        };

        let domain_bytes = spec.get_domain_constant(domain_type).to_le_bytes();
        let epoch_bytes = epoch.as_u64().to_le_bytes();

        const NUM_DOMAIN_BYTES: usize = 4;
        const NUM_EPOCH_BYTES: usize = 8;
        const NUM_MIX_BYTES: usize = 32;

        let mut preimage = [0; NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES + NUM_MIX_BYTES];
        preimage[0..NUM_DOMAIN_BYTES].copy_from_slice(&domain_bytes);
        preimage[NUM_DOMAIN_BYTES..NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES]
            .copy_from_slice(&epoch_bytes);
        preimage[NUM_DOMAIN_BYTES + NUM_EPOCH_BYTES..].copy_from_slice(mix.as_bytes());

        Ok(Hash256::from_slice(&hash(&preimage)))
    }

    /*
     * Proposer selection
     */

    /// Compute the proposer index for `slot`. Deterministic in `(self, slot)`.
    pub fn get_beacon_proposer_index(
        &self,
        slot: Slot,
        spec: &ChainSpec,
    ) -> Result<usize, Error> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let seed = self.get_beacon_proposer_seed(slot, spec)?;
        let indices = self.get_active_validator_indices(epoch);

        self.compute_proposer_index(&indices, &seed, spec)
    }

    /// Compute the seed used to select the proposer at `slot`.
    fn get_beacon_proposer_seed(&self, slot: Slot, spec: &ChainSpec) -> Result<Vec<u8>, Error> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let mut preimage = self
            .get_seed(epoch, Domain::BeaconProposer, spec)?
            .as_bytes()
            .to_vec();
        preimage.extend_from_slice(&slot.as_u64().to_le_bytes());
        Ok(hash(&preimage))
    }

    /// Sample a proposer from `indices`, weighted by effective balance.
    fn compute_proposer_index(
        &self,
        indices: &[usize],
        seed: &[u8],
        spec: &ChainSpec,
    ) -> Result<usize, Error> {
        if indices.is_empty() {
            return Err(Error::InsufficientValidators);
        }

        let mut i = 0;
        loop {
            let shuffled_index = compute_shuffled_index(
                i.safe_rem(indices.len())?,
                indices.len(),
                seed,
                spec.shuffle_round_count,
            )
            .ok_or(Error::UnableToShuffle)?;
            let candidate_index = *indices
                .get(shuffled_index)
                .ok_or(Error::ShuffleIndexOutOfBounds(shuffled_index))?;

            let random_byte = {
                let mut preimage = seed.to_vec();
                preimage.extend_from_slice(&(i.safe_div(32)? as u64).to_le_bytes());
                let hashed = hash(&preimage);
                hashed[i.safe_rem(32)?] as u64
            };

            let effective_balance = self.get_effective_balance(candidate_index)?;
            if effective_balance.safe_mul(MAX_RANDOM_BYTE)?
                >= spec.max_effective_balance.safe_mul(random_byte)?
            {
                return Ok(candidate_index);
            }
            i.safe_add_assign(1)?;
        }
    }

    /*
     * Committees
     */

    /// Get the committee cache for some `relative_epoch`, erroring if uninitialized.
    pub fn committee_cache(
        &self,
        relative_epoch: RelativeEpoch,
    ) -> Result<&Arc<CommitteeCache>, Error> {
        let i: usize = relative_epoch.into();
        let cache = &self.committee_caches[i];

        if cache.is_initialized_at(relative_epoch.into_epoch(self.current_epoch())) {
            Ok(cache)
        } else {
            Err(Error::CommitteeCacheUninitialized(Some(relative_epoch)))
        }
    }

    /// Build an epoch cache, unless it is already built.
    pub fn build_committee_cache(
        &mut self,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        let i: usize = relative_epoch.into();
        let epoch = relative_epoch.into_epoch(self.current_epoch());

        if !self.committee_caches[i].is_initialized_at(epoch) {
            self.force_build_committee_cache(relative_epoch, spec)?;
        }
        Ok(())
    }

    /// Always builds the requested committee cache, even if it is already initialized.
    pub fn force_build_committee_cache(
        &mut self,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        let epoch = relative_epoch.into_epoch(self.current_epoch());
        let i: usize = relative_epoch.into();

        let committee_cache = CommitteeCache::initialized(self, epoch, spec)?;
        self.committee_caches[i] = Arc::new(committee_cache);
        Ok(())
    }

    /// Build all committee caches plus the pubkey cache and total active balance.
    pub fn build_all_caches(&mut self, spec: &ChainSpec) -> Result<(), Error> {
        self.build_committee_cache(RelativeEpoch::Previous, spec)?;
        self.build_committee_cache(RelativeEpoch::Current, spec)?;
        self.build_committee_cache(RelativeEpoch::Next, spec)?;
        self.update_pubkey_cache()?;
        self.build_total_active_balance_cache(spec)?;
        Ok(())
    }

    /// Discard every derived cache, leaving only the consensus fields.
    pub fn drop_all_caches(&mut self) {
        self.committee_caches = [
            Arc::new(CommitteeCache::default()),
            Arc::new(CommitteeCache::default()),
            Arc::new(CommitteeCache::default()),
        ];
        self.pubkey_cache = PubkeyCache::default();
        self.total_active_balance = None;
    }

    /// Rotate the committee caches forward one epoch: the current-epoch cache becomes the
    /// previous-epoch cache and the next-epoch slot is left empty.
    ///
    /// Must only be called when `self.slot` has just crossed into a new epoch.
    pub fn advance_committee_caches(&mut self) {
        self.committee_caches.rotate_left(1);
        let i: usize = RelativeEpoch::Next.into();
        self.committee_caches[i] = Arc::new(CommitteeCache::default());
    }

    /// Get the committee for the given `slot` and committee `index`.
    pub fn get_beacon_committee(
        &self,
        slot: Slot,
        index: u64,
    ) -> Result<BeaconCommittee, Error> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let relative_epoch = RelativeEpoch::from_epoch(self.current_epoch(), epoch)?;
        let cache = self.committee_cache(relative_epoch)?;

        cache
            .get_beacon_committee(slot, index)
            .ok_or(Error::NoCommittee { slot, index })
    }

    /// Get the number of committees at the given `slot`.
    pub fn get_committee_count_at_slot(&self, slot: Slot) -> Result<u64, Error> {
        let epoch = slot.epoch(T::slots_per_epoch());
        let relative_epoch = RelativeEpoch::from_epoch(self.current_epoch(), epoch)?;
        Ok(self
            .committee_cache(relative_epoch)?
            .get_committees_per_slot())
    }

    /// Get the attestation duty of `validator_index` in `epoch`, if it is active.
    pub fn get_attestation_duties(
        &self,
        validator_index: usize,
        relative_epoch: RelativeEpoch,
    ) -> Result<Option<AttestationDuty>, Error> {
        Ok(self
            .committee_cache(relative_epoch)?
            .get_attestation_duties(validator_index))
    }

    /*
     * Pubkey cache
     */

    /// Update the pubkey cache to cover every validator in the registry.
    pub fn update_pubkey_cache(&mut self) -> Result<(), Error> {
        // The registry is append-only, so resuming from the cache length is sound.
        for (i, validator) in self
            .validators
            .iter()
            .enumerate()
            .skip(self.pubkey_cache.len())
        {
            if !self.pubkey_cache.insert(validator.pubkey, i) {
                return Err(Error::PubkeyCacheInconsistent);
            }
        }
        Ok(())
    }

    /*
     * Balances
     */

    /// Sum of effective balances of `indices`, floored at one effective-balance increment.
    pub fn get_total_balance(&self, indices: &[usize], spec: &ChainSpec) -> Result<u64, Error> {
        let mut total = 0u64;
        for &index in indices {
            total = total.safe_add(self.get_effective_balance(index)?)?;
        }
        Ok(std::cmp::max(total, spec.effective_balance_increment))
    }

    /// Cache the total active balance for the current epoch.
    pub fn build_total_active_balance_cache(&mut self, spec: &ChainSpec) -> Result<(), Error> {
        let current_epoch = self.current_epoch();
        if self
            .total_active_balance
            .map_or(true, |(epoch, _)| epoch != current_epoch)
        {
            let total = self
                .get_total_balance(&self.get_active_validator_indices(current_epoch), spec)?;
            self.total_active_balance = Some((current_epoch, total));
        }
        Ok(())
    }

    /// The cached total active balance for the current epoch.
    pub fn get_total_active_balance(&self) -> Result<u64, Error> {
        match self.total_active_balance {
            Some((epoch, balance)) if epoch == self.current_epoch() => Ok(balance),
            _ => Err(Error::TotalActiveBalanceCacheUninitialized),
        }
    }

    /*
     * Participation
     */

    /// The participation flags for `epoch`, which must be the current or previous epoch.
    pub fn get_epoch_participation_mut(
        &mut self,
        epoch: Epoch,
    ) -> Result<&mut VariableList<ParticipationFlags, T::ValidatorRegistryLimit>, Error> {
        if epoch == self.current_epoch() {
            Ok(&mut self.current_epoch_participation)
        } else if epoch == self.previous_epoch() {
            Ok(&mut self.previous_epoch_participation)
        } else {
            Err(Error::EpochOutOfBounds)
        }
    }

    /*
     * Slashings
     */

    fn get_slashings_index(&self, epoch: Epoch) -> Result<usize, Error> {
        epoch
            .as_usize()
            .safe_rem(T::epochs_per_slashings_vector())
            .map_err(Into::into)
    }

    pub fn get_slashings_at(&self, epoch: Epoch) -> Result<u64, Error> {
        let i = self.get_slashings_index(epoch)?;
        self.slashings.get(i).copied().ok_or(Error::EpochOutOfBounds)
    }

    pub fn set_slashings_at(&mut self, epoch: Epoch, value: u64) -> Result<(), Error> {
        let i = self.get_slashings_index(epoch)?;
        *self.slashings.get_mut(i).ok_or(Error::EpochOutOfBounds)? = value;
        Ok(())
    }

    /// The sum of the entire slashings ring.
    pub fn get_total_slashings(&self) -> u64 {
        self.slashings.iter().sum()
    }

    /*
     * Sync committees
     */

    /// Compute the sync committee for the period starting after `epoch`'s period boundary.
    ///
    /// Samples `SyncCommitteeSize` seats from the active set, weighted by effective balance.
    pub fn get_next_sync_committee(&self, spec: &ChainSpec) -> Result<SyncCommittee<T>, Error> {
        let sync_committee_indices = self.get_next_sync_committee_indices(spec)?;

        let mut pubkeys = Vec::with_capacity(T::sync_committee_size());
        for &index in &sync_committee_indices {
            pubkeys.push(self.get_validator(index)?.pubkey);
        }

        // The aggregate covers every seat, including repeats.
        let decompressed = pubkeys
            .iter()
            .map(|pk| pk.decompress())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::PubkeyCacheInconsistent)?;
        let aggregate_pubkey = AggregatePublicKey::aggregate(&decompressed.iter().collect::<Vec<_>>())
            .map_err(|_| Error::PubkeyCacheInconsistent)?
            .to_public_key()
            .compress();

        Ok(SyncCommittee {
            pubkeys: FixedVector::new(pubkeys).map_err(Error::SszTypesError)?,
            aggregate_pubkey,
        })
    }

    /// Sample the validator indices occupying the next sync-committee period's seats.
    pub fn get_next_sync_committee_indices(&self, spec: &ChainSpec) -> Result<Vec<usize>, Error> {
        let epoch = self.current_epoch().safe_add(1u64)?;

        let active_validator_indices = self.get_active_validator_indices(epoch);
        if active_validator_indices.is_empty() {
            return Err(Error::InsufficientValidators);
        }
        let active_validator_count = active_validator_indices.len();

        let seed = self.get_seed(epoch, Domain::SyncCommittee, spec)?;

        let mut i = 0usize;
        let mut sync_committee_indices = Vec::with_capacity(T::sync_committee_size());
        while sync_committee_indices.len() < T::sync_committee_size() {
            let shuffled_index = compute_shuffled_index(
                i.safe_rem(active_validator_count)?,
                active_validator_count,
                seed.as_bytes(),
                spec.shuffle_round_count,
            )
            .ok_or(Error::UnableToShuffle)?;
            let candidate_index = *active_validator_indices
                .get(shuffled_index)
                .ok_or(Error::ShuffleIndexOutOfBounds(shuffled_index))?;

            let random_byte = {
                let mut preimage = seed.as_bytes().to_vec();
                preimage.extend_from_slice(&(i.safe_div(32)? as u64).to_le_bytes());
                let hashed = hash(&preimage);
                hashed[i.safe_rem(32)?] as u64
            };

            let effective_balance = self.get_effective_balance(candidate_index)?;
            if effective_balance.safe_mul(MAX_RANDOM_BYTE)?
                >= spec.max_effective_balance.safe_mul(random_byte)?
            {
                sync_committee_indices.push(candidate_index);
            }
            i.safe_add_assign(1)?;
        }

        Ok(sync_committee_indices)
    }
}
