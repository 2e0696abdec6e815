use crate::{
    get_key_for_col, DBColumn, Error, ItemStore, KeyValueStore, KeyValueStoreOp,
    PersistedCheckpoints,
};
use ssz::{Decode, Encode};
use std::marker::PhantomData;
use std::sync::Arc;
use types::{BeaconState, ChainSpec, Checkpoint, EthSpec, Hash256, SignedBeaconBlock, Slot};

/// The typed store the orchestrator persists through.
///
/// Wraps a `KeyValueStore` with the beacon-chain key spaces: `block/<root>`, `state/<root>`,
/// `checkpoint/{justified,finalized}`, `head`, `badblock/<root>` and `archive/<slot>`.
#[derive(Debug)]
pub struct Store<E: EthSpec, KV: KeyValueStore<E>> {
    pub db: KV,
    pub(crate) spec: ChainSpec,
    _phantom: PhantomData<E>,
}

/// An operation for the atomic commit at the end of block import.
#[derive(Debug, Clone)]
pub enum StoreOp<E: EthSpec> {
    PutBlock(Hash256, Arc<SignedBeaconBlock<E>>),
    PutState(Hash256, Arc<BeaconState<E>>),
    PutHead(Hash256),
    PutCheckpoints(PersistedCheckpoints),
    PutBadBlock(Hash256),
    PutArchiveEntry(Slot, Hash256),
    DeleteBlock(Hash256),
    DeleteState(Hash256),
}

/// The key under which the head pointer and checkpoint marks are stored in their columns.
const META_KEY: [u8; 1] = [0];

impl<E: EthSpec, KV: KeyValueStore<E>> Store<E, KV> {
    pub fn new(db: KV, spec: ChainSpec) -> Self {
        Self {
            db,
            spec,
            _phantom: PhantomData,
        }
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    /*
     * Blocks
     */

    pub fn put_block(
        &self,
        block_root: &Hash256,
        block: &SignedBeaconBlock<E>,
    ) -> Result<(), Error> {
        self.db.put_bytes(
            DBColumn::BeaconBlock.into(),
            block_root.as_bytes(),
            &block.as_ssz_bytes(),
        )
    }

    pub fn get_block(&self, block_root: &Hash256) -> Result<Option<SignedBeaconBlock<E>>, Error> {
        match self
            .db
            .get_bytes(DBColumn::BeaconBlock.into(), block_root.as_bytes())?
        {
            Some(bytes) => Ok(Some(SignedBeaconBlock::from_ssz_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn block_exists(&self, block_root: &Hash256) -> Result<bool, Error> {
        self.db
            .key_exists(DBColumn::BeaconBlock.into(), block_root.as_bytes())
    }

    /*
     * States
     */

    pub fn put_state(&self, state_root: &Hash256, state: &BeaconState<E>) -> Result<(), Error> {
        self.db.put_bytes(
            DBColumn::BeaconState.into(),
            state_root.as_bytes(),
            &state.as_ssz_bytes(),
        )
    }

    /// Load a state from disk. The caches of the returned state are empty; callers rebuild what
    /// they need.
    pub fn get_state(&self, state_root: &Hash256) -> Result<Option<BeaconState<E>>, Error> {
        match self
            .db
            .get_bytes(DBColumn::BeaconState.into(), state_root.as_bytes())?
        {
            Some(bytes) => Ok(Some(BeaconState::from_ssz_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /*
     * Head and checkpoints
     */

    pub fn put_head(&self, head_root: Hash256) -> Result<(), Error> {
        self.db.put_bytes(
            DBColumn::BeaconChainHead.into(),
            &META_KEY,
            head_root.as_bytes(),
        )
    }

    pub fn get_head(&self) -> Result<Option<Hash256>, Error> {
        Ok(self
            .db
            .get_bytes(DBColumn::BeaconChainHead.into(), &META_KEY)?
            .map(|bytes| Hash256::from_slice(&bytes)))
    }

    pub fn put_checkpoints(&self, justified: Checkpoint, finalized: Checkpoint) -> Result<(), Error> {
        self.db.put_item(
            &META_KEY,
            &PersistedCheckpoints {
                justified,
                finalized,
            },
        )
    }

    pub fn get_checkpoints(&self) -> Result<Option<PersistedCheckpoints>, Error> {
        self.db.get_item(&META_KEY)
    }

    /*
     * Bad blocks
     */

    pub fn put_bad_block_mark(&self, block_root: Hash256) -> Result<(), Error> {
        self.db
            .put_bytes(DBColumn::BadBlock.into(), block_root.as_bytes(), &[1])
    }

    pub fn is_bad_block(&self, block_root: &Hash256) -> Result<bool, Error> {
        self.db
            .key_exists(DBColumn::BadBlock.into(), block_root.as_bytes())
    }

    /*
     * Archive
     */

    /// Record the canonical block root for a finalized slot.
    pub fn put_archive_entry(&self, slot: Slot, block_root: Hash256) -> Result<(), Error> {
        self.db.put_bytes(
            DBColumn::BeaconArchive.into(),
            &slot.as_u64().to_be_bytes(),
            block_root.as_bytes(),
        )
    }

    pub fn get_archive_entry(&self, slot: Slot) -> Result<Option<Hash256>, Error> {
        Ok(self
            .db
            .get_bytes(DBColumn::BeaconArchive.into(), &slot.as_u64().to_be_bytes())?
            .map(|bytes| Hash256::from_slice(&bytes)))
    }

    /*
     * Atomic batches
     */

    /// Convert a batch of `StoreOp` into a batch of `KeyValueStoreOp`.
    pub fn convert_to_kv_batch(
        &self,
        batch: Vec<StoreOp<E>>,
    ) -> Result<Vec<KeyValueStoreOp>, Error> {
        batch
            .into_iter()
            .map(|op| {
                Ok(match op {
                    StoreOp::PutBlock(block_root, block) => KeyValueStoreOp::PutKeyValue(
                        get_key_for_col(DBColumn::BeaconBlock.into(), block_root.as_bytes()),
                        block.as_ssz_bytes(),
                    ),
                    StoreOp::PutState(state_root, state) => KeyValueStoreOp::PutKeyValue(
                        get_key_for_col(DBColumn::BeaconState.into(), state_root.as_bytes()),
                        state.as_ssz_bytes(),
                    ),
                    StoreOp::PutHead(head_root) => KeyValueStoreOp::PutKeyValue(
                        get_key_for_col(DBColumn::BeaconChainHead.into(), &META_KEY),
                        head_root.as_bytes().to_vec(),
                    ),
                    StoreOp::PutCheckpoints(checkpoints) => KeyValueStoreOp::PutKeyValue(
                        get_key_for_col(DBColumn::BeaconCheckpoint.into(), &META_KEY),
                        checkpoints.as_ssz_bytes(),
                    ),
                    StoreOp::PutBadBlock(block_root) => KeyValueStoreOp::PutKeyValue(
                        get_key_for_col(DBColumn::BadBlock.into(), block_root.as_bytes()),
                        vec![1],
                    ),
                    StoreOp::PutArchiveEntry(slot, block_root) => KeyValueStoreOp::PutKeyValue(
                        get_key_for_col(
                            DBColumn::BeaconArchive.into(),
                            &slot.as_u64().to_be_bytes(),
                        ),
                        block_root.as_bytes().to_vec(),
                    ),
                    StoreOp::DeleteBlock(block_root) => KeyValueStoreOp::DeleteKey(
                        get_key_for_col(DBColumn::BeaconBlock.into(), block_root.as_bytes()),
                    ),
                    StoreOp::DeleteState(state_root) => KeyValueStoreOp::DeleteKey(
                        get_key_for_col(DBColumn::BeaconState.into(), state_root.as_bytes()),
                    ),
                })
            })
            .collect()
    }

    /// Execute either all of the operations in `batch` or none at all.
    pub fn do_atomically(&self, batch: Vec<StoreOp<E>>) -> Result<(), Error> {
        self.db.do_atomically(self.convert_to_kv_batch(batch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use types::{BeaconBlock, Epoch, Eth1Data, MinimalEthSpec, SignatureBytes};

    type E = MinimalEthSpec;

    fn test_store() -> Store<E, MemoryStore<E>> {
        Store::new(MemoryStore::open(), E::default_spec())
    }

    #[test]
    fn block_round_trip() {
        let store = test_store();
        let spec = E::default_spec();

        let block = SignedBeaconBlock {
            message: BeaconBlock::empty(&spec),
            signature: SignatureBytes::empty(),
        };
        let root = block.canonical_root();

        store.put_block(&root, &block).unwrap();
        let loaded = store.get_block(&root).unwrap().expect("block should exist");
        assert_eq!(loaded, block);
        assert_eq!(loaded.canonical_root(), root);

        assert!(store.get_block(&Hash256::repeat_byte(7)).unwrap().is_none());
    }

    #[test]
    fn state_round_trip_preserves_root() {
        let store = test_store();
        let spec = E::default_spec();

        let state = BeaconState::<E>::new(42, Eth1Data::default(), &spec);
        let root = state.canonical_root();

        store.put_state(&root, &state).unwrap();
        let loaded = store.get_state(&root).unwrap().expect("state should exist");
        assert_eq!(loaded.canonical_root(), root);
    }

    #[test]
    fn checkpoints_and_head() {
        let store = test_store();

        assert!(store.get_head().unwrap().is_none());
        assert!(store.get_checkpoints().unwrap().is_none());

        let head = Hash256::repeat_byte(3);
        let justified = Checkpoint {
            epoch: Epoch::new(1),
            root: Hash256::repeat_byte(1),
        };
        let finalized = Checkpoint {
            epoch: Epoch::new(0),
            root: Hash256::repeat_byte(2),
        };

        store.put_head(head).unwrap();
        store.put_checkpoints(justified, finalized).unwrap();

        assert_eq!(store.get_head().unwrap(), Some(head));
        let checkpoints = store.get_checkpoints().unwrap().unwrap();
        assert_eq!(checkpoints.justified, justified);
        assert_eq!(checkpoints.finalized, finalized);
    }

    #[test]
    fn bad_block_marks() {
        let store = test_store();
        let root = Hash256::repeat_byte(9);

        assert!(!store.is_bad_block(&root).unwrap());
        store.put_bad_block_mark(root).unwrap();
        assert!(store.is_bad_block(&root).unwrap());
    }

    #[test]
    fn atomic_batch_commits_everything() {
        let store = test_store();
        let spec = E::default_spec();

        let block = Arc::new(SignedBeaconBlock {
            message: BeaconBlock::empty(&spec),
            signature: SignatureBytes::empty(),
        });
        let block_root = block.canonical_root();
        let state = Arc::new(BeaconState::<E>::new(0, Eth1Data::default(), &spec));
        let state_root = state.canonical_root();

        store
            .do_atomically(vec![
                StoreOp::PutBlock(block_root, block),
                StoreOp::PutState(state_root, state),
                StoreOp::PutHead(block_root),
                StoreOp::PutArchiveEntry(Slot::new(0), block_root),
            ])
            .unwrap();

        assert!(store.block_exists(&block_root).unwrap());
        assert!(store.get_state(&state_root).unwrap().is_some());
        assert_eq!(store.get_head().unwrap(), Some(block_root));
        assert_eq!(
            store.get_archive_entry(Slot::new(0)).unwrap(),
            Some(block_root)
        );
    }
}
