use crate::attestation_verification::{AttestationError, VerifiedAttestation};
use crate::beacon_fork_choice_store::BeaconForkChoiceStore;
use crate::beacon_snapshot::BeaconSnapshot;
use crate::block_verification::{BlockError, ExecutedBlock, SignatureVerifiedBlock};
use crate::errors::BeaconChainError;
use crate::events::{ChainEvent, ChainObserver, ObserverRegistry};
use crate::execution_engine::ExecutionEngine;
use crate::head_tracker::HeadTracker;
use fork_choice::{AttestationFromBlock, ForkChoice};
use operation_pool::OperationPool;
use parking_lot::{Mutex, RwLock};
use slog::{debug, info, warn, Logger};
use state_processing::common::get_indexed_attestation;
use state_processing::per_block_processing::errors::{
    AttesterSlashingValidationError, ExitValidationError, ProposerSlashingValidationError,
};
use state_processing::{complete_state_advance, BlockReplayError, BlockReplayer};
use std::sync::Arc;
use store::{HotStateCache, KeyValueStore, Store, StoreOp};
use types::{
    Attestation, AttesterSlashing, BeaconBlock, BeaconState, ChainSpec, Checkpoint, Deposit,
    EthSpec, Hash256, ProposerSlashing, SignedBeaconBlock, SignedVoluntaryExit, Slot,
};

/// The number of states the in-memory cache retains, on top of the pinned head, justified and
/// finalized states.
pub const DEFAULT_STATE_CACHE_SIZE: usize = 32;

/// The result of offering an object to the chain, as reported back to the network feeder.
#[derive(Debug)]
pub enum ReceiveOutcome<R> {
    /// The object was valid and has been applied.
    Accepted,
    /// The object cannot be judged yet (e.g. missing ancestors); it may be retried later.
    Ignored(R),
    /// The object is invalid and must not be retried.
    Rejected(R),
}

impl<R> ReceiveOutcome<R> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ReceiveOutcome::Accepted)
    }
}

/// Validation failures for pool-bound operations.
#[derive(Debug)]
pub enum OperationError {
    Exit(ExitValidationError),
    ProposerSlashing(ProposerSlashingValidationError),
    AttesterSlashing(AttesterSlashingValidationError),
}

/// Runtime toggles of the orchestrator.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Verify BLS signatures during import. Only ever disabled in benchmarks.
    pub verify_signatures: bool,
    /// Capacity of the unpinned portion of the state cache.
    pub state_cache_size: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            state_cache_size: DEFAULT_STATE_CACHE_SIZE,
        }
    }
}

type ChainForkChoice<E, KV> = ForkChoice<BeaconForkChoiceStore<E, KV>, E>;

/// The single-writer orchestrator of the consensus core.
///
/// Owns exclusive mutation of the cached head, the fork-choice store and the operation pool.
/// Readers obtain consistent views through the atomically-swapped head snapshot; they never
/// observe a torn update.
pub struct BeaconChain<E: EthSpec, KV: KeyValueStore<E>> {
    pub spec: ChainSpec,
    pub config: ChainConfig,
    /// Persistent storage with atomic batches.
    pub store: Arc<Store<E, KV>>,
    /// Operations gossiped to us, awaiting inclusion in a block.
    pub op_pool: OperationPool<E>,
    /// The external execution-layer collaborator.
    pub(crate) execution_engine: Arc<dyn ExecutionEngine<E>>,
    /// The canonical head: an immutable snapshot behind a single pointer swap.
    canonical_head: RwLock<Arc<BeaconSnapshot<E>>>,
    /// The fork-choice store and DAG.
    fork_choice: RwLock<ChainForkChoice<E, KV>>,
    /// Recently-used states by state root; head/justified/finalized pinned.
    state_cache: Mutex<HotStateCache<E>>,
    /// The head state advanced through empty slots at epoch boundaries, keyed by head block
    /// root.
    early_head_state: Mutex<Option<(Hash256, Arc<BeaconState<E>>)>>,
    /// Roots of blocks that failed state transition. Descendants are rejected without
    /// re-execution; siblings are unaffected.
    bad_blocks: Mutex<std::collections::HashSet<Hash256>>,
    /// The checkpoints most recently published to observers.
    published_checkpoints: Mutex<(Checkpoint, Checkpoint)>,
    /// Subscribed observers, invoked synchronously on this writer task.
    observers: ObserverRegistry<E>,
    /// All known chain tips.
    pub head_tracker: HeadTracker,
    /// The wall-clock slot, fed by the external timer through `on_slot`.
    wall_slot: RwLock<Slot>,
    genesis_block_root: Hash256,
    log: Logger,
}

impl<E: EthSpec, KV: KeyValueStore<E>> BeaconChain<E, KV> {
    /// Instantiate a new chain from its genesis state.
    ///
    /// Derives the genesis block, persists both and roots fork choice at them.
    pub fn from_genesis(
        store: Arc<Store<E, KV>>,
        execution_engine: Arc<dyn ExecutionEngine<E>>,
        mut genesis_state: BeaconState<E>,
        config: ChainConfig,
        log: Logger,
    ) -> Result<Self, BeaconChainError> {
        let spec = store.spec().clone();

        genesis_state.build_all_caches(&spec)?;

        let mut genesis_block = BeaconBlock::empty(&spec);
        genesis_state.latest_block_header = genesis_block.temporary_block_header();
        let genesis_state_root = genesis_state.canonical_root();
        genesis_block.state_root = genesis_state_root;
        let genesis_block_root = genesis_block.canonical_root();

        let genesis_block = Arc::new(SignedBeaconBlock {
            message: genesis_block,
            signature: types::SignatureBytes::empty(),
        });
        let genesis_state = Arc::new(genesis_state);

        store.do_atomically(vec![
            StoreOp::PutBlock(genesis_block_root, genesis_block.clone()),
            StoreOp::PutState(genesis_state_root, genesis_state.clone()),
            StoreOp::PutHead(genesis_block_root),
        ])?;

        let genesis_snapshot = BeaconSnapshot::new(
            genesis_block.clone(),
            genesis_block_root,
            genesis_state.clone(),
        );

        let fc_store = BeaconForkChoiceStore::get_forkchoice_store(store.clone(), &genesis_snapshot);
        let justified = *fork_choice::ForkChoiceStore::justified_checkpoint(&fc_store);
        let finalized = *fork_choice::ForkChoiceStore::finalized_checkpoint(&fc_store);
        let fork_choice = ForkChoice::from_anchor(
            fc_store,
            genesis_block_root,
            &genesis_block.message,
            &genesis_state,
        )
        .map_err(|e| BeaconChainError::ForkChoice(format!("{:?}", e)))?;

        store.put_checkpoints(justified, finalized)?;

        let mut state_cache = HotStateCache::new(config.state_cache_size);
        state_cache.put(genesis_state_root, genesis_state.clone());
        state_cache.update_pinned(&[genesis_state_root]);

        info!(
            log,
            "Beacon chain initialized";
            "genesis_block_root" => ?genesis_block_root,
            "validators" => genesis_state.validators.len(),
        );

        Ok(Self {
            spec,
            config,
            store,
            op_pool: OperationPool::new(),
            execution_engine,
            canonical_head: RwLock::new(Arc::new(genesis_snapshot)),
            fork_choice: RwLock::new(fork_choice),
            state_cache: Mutex::new(state_cache),
            early_head_state: Mutex::new(None),
            bad_blocks: Mutex::new(Default::default()),
            published_checkpoints: Mutex::new((justified, finalized)),
            observers: ObserverRegistry::default(),
            head_tracker: HeadTracker::default(),
            wall_slot: RwLock::new(Slot::new(0)),
            genesis_block_root,
            log,
        })
    }

    /// Subscribe an observer to chain events.
    pub fn register_observer(&self, observer: Arc<dyn ChainObserver<E>>) {
        self.observers.register(observer);
    }

    /*
     * Accessors used across the import pipeline.
     */

    pub fn current_slot(&self) -> Slot {
        *self.wall_slot.read()
    }

    pub fn genesis_block_root(&self) -> Hash256 {
        self.genesis_block_root
    }

    /// The current canonical head snapshot: block, root and state with built caches.
    pub fn head_snapshot(&self) -> Arc<BeaconSnapshot<E>> {
        self.canonical_head.read().clone()
    }

    /// The root of the canonical head block.
    pub fn head_root(&self) -> Hash256 {
        self.canonical_head.read().beacon_block_root
    }

    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.fork_choice.read().justified_checkpoint()
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.fork_choice.read().finalized_checkpoint()
    }

    pub fn fork_choice_contains_block(&self, block_root: &Hash256) -> bool {
        self.fork_choice.read().contains_block(block_root)
    }

    /// The subtree weight fork choice currently assigns to a block.
    pub fn block_weight(&self, block_root: &Hash256) -> Option<u64> {
        self.fork_choice.read().get_weight(block_root)
    }

    /// The fork-choice view of a block, if it is known.
    pub fn fork_choice_block(&self, block_root: &Hash256) -> Option<fork_choice::ProtoBlock> {
        self.fork_choice.read().get_block(block_root)
    }

    pub fn is_known_bad_block(&self, block_root: &Hash256) -> bool {
        if self.bad_blocks.lock().contains(block_root) {
            return true;
        }
        self.store.is_bad_block(block_root).unwrap_or(false)
    }

    /// Whether a block has been imported, either still in fork choice or already finalized into
    /// the store.
    pub fn block_is_known(&self, block_root: &Hash256) -> Result<bool, BeaconChainError> {
        if self.fork_choice.read().contains_block(block_root) {
            return Ok(true);
        }
        Ok(self.store.block_exists(block_root)?)
    }

    pub fn get_stored_block(
        &self,
        block_root: &Hash256,
    ) -> Result<Option<SignedBeaconBlock<E>>, BeaconChainError> {
        Ok(self.store.get_block(block_root)?)
    }

    /// Obtain the pre-state for importing `block`: the post-state of its parent.
    ///
    /// Sources, in order: the early-advanced head state, the state cache, the store, and
    /// finally replay from the nearest stored snapshot. The second tuple element is the state's
    /// root when it is known without hashing.
    pub fn state_for_block_import(
        &self,
        block: &SignedBeaconBlock<E>,
    ) -> Result<(BeaconState<E>, Option<Hash256>), BeaconChainError> {
        let parent_root = block.parent_root();

        if let Some((root, state)) = self.early_head_state.lock().clone() {
            if root == parent_root && state.slot <= block.slot() {
                return Ok(((*state).clone(), None));
            }
        }

        let parent_block = self
            .get_stored_block(&parent_root)?
            .ok_or(BeaconChainError::MissingBeaconBlock(parent_root))?;
        let parent_state_root = parent_block.state_root();

        if let Some(state) = self.state_cache.lock().get(&parent_state_root) {
            return Ok(((*state).clone(), Some(parent_state_root)));
        }

        if let Some(state) = self.store.get_state(&parent_state_root)? {
            return Ok((state, Some(parent_state_root)));
        }

        // Replay from the nearest ancestor whose post-state we still have.
        debug!(
            self.log,
            "Replaying chain segment for pre-state";
            "parent_root" => ?parent_root,
        );
        let mut segment = vec![parent_block];
        loop {
            let earliest = segment.last().expect("segment is non-empty");
            let ancestor_root = earliest.parent_root();
            let ancestor_block = self
                .get_stored_block(&ancestor_root)?
                .ok_or(BeaconChainError::MissingReplayAncestor {
                    block_root: ancestor_root,
                })?;
            let ancestor_state_root = ancestor_block.state_root();

            let snapshot_state = match self.state_cache.lock().get(&ancestor_state_root) {
                Some(state) => Some((*state).clone()),
                None => self.store.get_state(&ancestor_state_root)?,
            };

            if let Some(snapshot_state) = snapshot_state {
                segment.reverse();
                let replayer = BlockReplayer::<E, BlockReplayError>::new(snapshot_state, &self.spec)
                    .no_state_root_iter()
                    .apply_blocks(segment)
                    .map_err(|e| BeaconChainError::StoreError(store::Error::from(e)))?;
                return Ok((replayer.into_state(), Some(parent_state_root)));
            }

            segment.push(ancestor_block);
        }
    }

    /*
     * Inbound objects.
     */

    /// Validate, execute and import a block received from the network.
    pub fn receive_block(&self, signed_block: SignedBeaconBlock<E>) -> ReceiveOutcome<BlockError> {
        let block = Arc::new(signed_block);
        let block_root = block.canonical_root();

        let result = SignatureVerifiedBlock::new(block, block_root, self)
            .and_then(|verified| verified.into_executed(self))
            .and_then(|executed| self.import_block(executed));

        match result {
            Ok(()) => ReceiveOutcome::Accepted,
            Err(e) => self.handle_block_error(block_root, e),
        }
    }

    fn handle_block_error(
        &self,
        block_root: Hash256,
        error: BlockError,
    ) -> ReceiveOutcome<BlockError> {
        if error.is_rejection() {
            warn!(
                self.log,
                "Rejected block";
                "block_root" => ?block_root,
                "reason" => ?error,
            );
            self.bad_blocks.lock().insert(block_root);
            if let Err(e) = self.store.put_bad_block_mark(block_root) {
                warn!(self.log, "Failed to persist bad-block mark"; "error" => ?e);
            }
            self.observers.publish(ChainEvent::BlockRejected { block_root });
            ReceiveOutcome::Rejected(error)
        } else {
            debug!(
                self.log,
                "Ignored block";
                "block_root" => ?block_root,
                "reason" => ?error,
            );
            ReceiveOutcome::Ignored(error)
        }
    }

    /// The persist + publish phases of block import.
    fn import_block(&self, executed: ExecutedBlock<E>) -> Result<(), BlockError> {
        let ExecutedBlock {
            block,
            block_root,
            post_state,
            execution_status,
        } = executed;

        let state_root = block.state_root();
        let post_state = Arc::new(post_state);

        // Persist phase: block and state land in one atomic batch; a crash between here and the
        // fork-choice update leaves only unreferenced data behind, never a torn chain.
        self.store
            .do_atomically(vec![
                StoreOp::PutBlock(block_root, block.clone()),
                StoreOp::PutState(state_root, post_state.clone()),
            ])
            .map_err(BeaconChainError::from)?;

        // Publish phase.
        let current_slot = self.current_slot();
        {
            let mut fork_choice = self.fork_choice.write();

            fork_choice
                .on_block(
                    current_slot,
                    &block.message,
                    block_root,
                    &post_state,
                    execution_status,
                    &self.spec,
                )
                .map_err(|e| BlockError::ForkChoice(format!("{:?}", e)))?;

            // Feed the votes and slashings the block carried into fork choice.
            for attestation in block.message.body.attestations.iter() {
                let data = &attestation.data;
                let committee =
                    match post_state.get_beacon_committee(data.slot, data.index) {
                        Ok(committee) => committee,
                        Err(_) => continue,
                    };
                if let Ok(indexed) = get_indexed_attestation(committee.committee, attestation) {
                    let _ = fork_choice.on_attestation(
                        current_slot,
                        &indexed,
                        AttestationFromBlock::True,
                    );
                }
            }
            for slashing in block.message.body.attester_slashings.iter() {
                fork_choice.on_attester_slashing(slashing);
            }
        }

        self.state_cache.lock().put(state_root, post_state);
        self.head_tracker.register_block(block_root, &block);

        self.observers.publish(ChainEvent::BlockProcessed {
            block_root,
            slot: block.slot(),
        });

        self.recompute_head(current_slot)?;

        Ok(())
    }

    /// Validate an attestation from the network, feed it to fork choice and pool it for
    /// inclusion.
    pub fn receive_attestation(
        &self,
        attestation: Attestation<E>,
    ) -> ReceiveOutcome<AttestationError> {
        let verified = match VerifiedAttestation::verify(&attestation, self) {
            Ok(verified) => verified,
            Err(e) => {
                return if e.is_rejection() {
                    ReceiveOutcome::Rejected(e)
                } else {
                    ReceiveOutcome::Ignored(e)
                }
            }
        };

        let current_slot = self.current_slot();
        let fork_choice_result = self.fork_choice.write().on_attestation(
            current_slot,
            &verified.indexed,
            AttestationFromBlock::False,
        );
        if let Err(e) = fork_choice_result {
            return ReceiveOutcome::Rejected(AttestationError::ForkChoice(format!("{:?}", e)));
        }

        {
            let head = self.head_snapshot();
            self.op_pool
                .insert_attestation(attestation.clone(), &head.beacon_state, &self.spec);
        }

        self.observers.publish(ChainEvent::AttestationProcessed {
            data: attestation.data,
        });

        if let Err(e) = self.recompute_head(current_slot) {
            warn!(self.log, "Head update failed"; "error" => ?e);
        }

        ReceiveOutcome::Accepted
    }

    /// Queue a deposit for inclusion, deduplicated by its contract index.
    pub fn receive_deposit(&self, deposit_index: u64, deposit: Deposit) -> ReceiveOutcome<OperationError> {
        self.op_pool.insert_deposit(deposit_index, deposit);
        ReceiveOutcome::Accepted
    }

    /// Validate a voluntary exit against the head state and pool it.
    pub fn receive_exit(&self, exit: SignedVoluntaryExit) -> ReceiveOutcome<OperationError> {
        let head = self.head_snapshot();
        match self
            .op_pool
            .insert_voluntary_exit(exit, &head.beacon_state, &self.spec)
        {
            Ok(()) => ReceiveOutcome::Accepted,
            Err(e) => ReceiveOutcome::Rejected(OperationError::Exit(e)),
        }
    }

    /// Validate a proposer slashing against the head state and pool it.
    pub fn receive_proposer_slashing(
        &self,
        slashing: ProposerSlashing,
    ) -> ReceiveOutcome<OperationError> {
        let head = self.head_snapshot();
        match self
            .op_pool
            .insert_proposer_slashing(slashing, &head.beacon_state, &self.spec)
        {
            Ok(()) => ReceiveOutcome::Accepted,
            Err(e) => ReceiveOutcome::Rejected(OperationError::ProposerSlashing(e)),
        }
    }

    /// Validate an attester slashing, pool it and mark the equivocators in fork choice.
    pub fn receive_attester_slashing(
        &self,
        slashing: AttesterSlashing<E>,
    ) -> ReceiveOutcome<OperationError> {
        let head = self.head_snapshot();
        match self
            .op_pool
            .insert_attester_slashing(slashing.clone(), &head.beacon_state, &self.spec)
        {
            Ok(()) => {
                self.fork_choice.write().on_attester_slashing(&slashing);
                ReceiveOutcome::Accepted
            }
            Err(e) => ReceiveOutcome::Rejected(OperationError::AttesterSlashing(e)),
        }
    }

    /*
     * Timer.
     */

    /// Called by the external timer once per slot.
    ///
    /// Ticks fork choice (pulling up unrealized checkpoints first), recomputes the head, and at
    /// epoch boundaries advances an idle head state so duties stay computable.
    pub fn on_slot(&self, slot: Slot) -> Result<(), BeaconChainError> {
        {
            let mut wall_slot = self.wall_slot.write();
            if slot > *wall_slot {
                *wall_slot = slot;
            }
        }
        let slot = self.current_slot();

        self.recompute_head(slot)?;

        if slot.is_epoch_boundary(E::slots_per_epoch()) {
            let head = self.head_snapshot();
            if head.beacon_block.slot() < slot {
                let mut advanced = (*head.beacon_state).clone();
                let state_root = head.beacon_state_root();
                complete_state_advance(&mut advanced, Some(state_root), slot, &self.spec)?;
                advanced.build_all_caches(&self.spec)?;
                *self.early_head_state.lock() =
                    Some((head.beacon_block_root, Arc::new(advanced)));
            }
        }

        Ok(())
    }

    /*
     * Head management.
     */

    /// Re-run head selection, swap the head snapshot if it moved and publish any events that
    /// fell out of the update.
    pub fn recompute_head(&self, current_slot: Slot) -> Result<(), BeaconChainError> {
        let old_head_root = self.head_root();
        let (old_justified, old_finalized) = *self.published_checkpoints.lock();

        let (new_head_root, new_justified, new_finalized) = {
            let mut fork_choice = self.fork_choice.write();
            let head_root = fork_choice.get_head(current_slot).map_err(|e| {
                warn!(self.log, "Fork choice failed to find a head"; "error" => ?e);
                BeaconChainError::ForkChoice(format!("{:?}", e))
            })?;
            (
                head_root,
                fork_choice.justified_checkpoint(),
                fork_choice.finalized_checkpoint(),
            )
        };

        if new_head_root != old_head_root {
            let reorg_depth = self.reorg_depth(old_head_root, new_head_root);
            self.set_head(new_head_root)?;
            self.observers.publish(ChainEvent::HeadChanged {
                new_head: new_head_root,
                old_head: old_head_root,
                reorg_depth,
            });
            if reorg_depth > 0 {
                info!(
                    self.log,
                    "Chain reorg";
                    "new_head" => ?new_head_root,
                    "old_head" => ?old_head_root,
                    "depth" => reorg_depth,
                );
            }
        }

        if new_justified != old_justified {
            self.observers
                .publish(ChainEvent::CheckpointJustified(new_justified));
        }
        if new_finalized != old_finalized {
            self.observers
                .publish(ChainEvent::CheckpointFinalized(new_finalized));
            self.after_finalization(new_finalized, old_finalized)?;
        }

        if new_justified != old_justified || new_finalized != old_finalized {
            *self.published_checkpoints.lock() = (new_justified, new_finalized);
            self.store.put_checkpoints(new_justified, new_finalized)?;
            self.update_pinned_states(new_justified, new_finalized);
        }

        if new_head_root != old_head_root {
            self.store.put_head(new_head_root)?;

            // Tell the execution layer about our view of the chain.
            let fork_choice = self.fork_choice.read();
            let head_hash = fork_choice
                .get_block(&new_head_root)
                .map(|b| b.execution_status.block_hash());
            let finalized_hash = fork_choice
                .get_block(&new_finalized.root)
                .map(|b| b.execution_status.block_hash());
            drop(fork_choice);
            if let Some(head_hash) = head_hash {
                let _ = self.execution_engine.notify_forkchoice_updated(
                    head_hash,
                    finalized_hash.unwrap_or_else(types::ExecutionBlockHash::zero),
                );
            }
        }

        Ok(())
    }

    /// The number of slots of the old head's branch abandoned by moving to the new head; zero
    /// for plain chain extension.
    fn reorg_depth(&self, old_head_root: Hash256, new_head_root: Hash256) -> u64 {
        let fork_choice = self.fork_choice.read();

        if fork_choice.is_descendant(old_head_root, new_head_root) {
            return 0;
        }

        let old_head_slot = fork_choice
            .get_block(&old_head_root)
            .map(|b| b.slot)
            .unwrap_or_else(|| Slot::new(0));

        let reorg_depth = fork_choice
            .proto_array()
            .core_proto_array()
            .iter_block_roots(&old_head_root)
            .find(|(root, _)| fork_choice.is_descendant(*root, new_head_root))
            .map(|(_, ancestor_slot)| old_head_slot.saturating_sub(ancestor_slot).as_u64())
            .unwrap_or_else(|| old_head_slot.as_u64());
        reorg_depth
    }

    /// Load and publish the snapshot for a new head root.
    fn set_head(&self, new_head_root: Hash256) -> Result<(), BeaconChainError> {
        let head_block = self
            .get_stored_block(&new_head_root)?
            .ok_or(BeaconChainError::MissingBeaconBlock(new_head_root))?;
        let head_state_root = head_block.state_root();

        let cached = self.state_cache.lock().get(&head_state_root);
        let mut head_state = match cached {
            Some(state) => (*state).clone(),
            None => self
                .store
                .get_state(&head_state_root)?
                .ok_or(BeaconChainError::MissingBeaconState(head_state_root))?,
        };

        // Readers resolve committees against the head snapshot; give it warm caches.
        head_state.build_all_caches(&self.spec)?;
        let head_state = Arc::new(head_state);

        self.state_cache
            .lock()
            .put(head_state_root, head_state.clone());

        // The early-advanced state belonged to the previous head.
        self.early_head_state.lock().take();

        let new_snapshot = BeaconSnapshot::new(
            Arc::new(head_block),
            new_head_root,
            head_state,
        );

        *self.canonical_head.write() = Arc::new(new_snapshot);

        Ok(())
    }

    /// Book-keeping after a new finalized checkpoint: archive the canonical chain, prune fork
    /// choice, the head tracker and the operation pool.
    fn after_finalization(
        &self,
        new_finalized: Checkpoint,
        old_finalized: Checkpoint,
    ) -> Result<(), BeaconChainError> {
        info!(
            self.log,
            "Checkpoint finalized";
            "epoch" => new_finalized.epoch.as_u64(),
            "root" => ?new_finalized.root,
        );

        // Record the canonical `slot -> root` mapping for the newly-finalized segment before the
        // tree is re-rooted.
        let old_finalized_slot = old_finalized.epoch.start_slot(E::slots_per_epoch());
        let archive_ops: Vec<StoreOp<E>> = {
            let fork_choice = self.fork_choice.read();
            fork_choice
                .proto_array()
                .core_proto_array()
                .iter_block_roots(&new_finalized.root)
                .take_while(|(_, slot)| *slot >= old_finalized_slot)
                .map(|(root, slot)| StoreOp::PutArchiveEntry(slot, root))
                .collect()
        };
        self.store.do_atomically(archive_ops)?;

        self.fork_choice
            .write()
            .prune()
            .map_err(|e| {
                warn!(self.log, "Failed to prune fork choice"; "error" => ?e);
                BeaconChainError::HeadMissingFromForkChoice(new_finalized.root)
            })?;

        self.head_tracker.prune_to(
            self.head_root(),
            new_finalized.epoch.start_slot(E::slots_per_epoch()),
        );

        // Prune the op pool against the finalized state, if we can load it.
        if let Some(finalized_block) = self.get_stored_block(&new_finalized.root)? {
            let finalized_state_root = finalized_block.state_root();
            let finalized_state = match self.state_cache.lock().get(&finalized_state_root) {
                Some(state) => Some((*state).clone()),
                None => self.store.get_state(&finalized_state_root)?,
            };
            if let Some(finalized_state) = finalized_state {
                self.op_pool.prune_all(&finalized_state, &self.spec);
            }
        }

        Ok(())
    }

    /// Pin the head, justified and finalized states so the cache can never evict them.
    fn update_pinned_states(&self, justified: Checkpoint, finalized: Checkpoint) {
        let mut roots = vec![self.head_snapshot().beacon_state_root()];
        for checkpoint in [justified, finalized] {
            if let Ok(Some(block)) = self.get_stored_block(&checkpoint.root) {
                roots.push(block.state_root());
            }
        }
        self.state_cache.lock().update_pinned(&roots);
    }
}
