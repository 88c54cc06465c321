//! Deterministic in-memory collaborators for tests.
//!
//! Every external dependency of the engine (pool, chain, wallets, election,
//! network) has an implementation here that returns deterministic values,
//! can be controlled programmatically, and never touches the filesystem or
//! network. Time is not abstracted — engine entry points take `Timestamp`
//! parameters, so tests simply pass the instants they want.

use crate::broadcast::Broadcaster;
use crate::election::Election;
use palisade_crypto::checksum_multi;
use palisade_store::{ChainStore, StoreError, TransactionPool, WalletInfo, WalletStore};
use palisade_types::{Amount, Block, Checksum, PublicKey, Transaction, TxId, WalletAddress};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// In-memory transaction pool.
#[derive(Default)]
pub struct MemPool {
    txs: Mutex<BTreeMap<TxId, Transaction>>,
    applied: Mutex<HashSet<TxId>>,
}

impl MemPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of transactions marked applied, for assertions.
    pub fn applied_ids(&self) -> HashSet<TxId> {
        self.applied.lock().unwrap().clone()
    }
}

impl TransactionPool for MemPool {
    fn unapplied(&self) -> Vec<Transaction> {
        let applied = self.applied.lock().unwrap();
        self.txs
            .lock()
            .unwrap()
            .values()
            .filter(|tx| !applied.contains(&tx.id))
            .cloned()
            .collect()
    }

    fn get(&self, id: &TxId) -> Option<Transaction> {
        self.txs.lock().unwrap().get(id).cloned()
    }

    fn apply_from_block(&self, block: &Block) -> Result<(), StoreError> {
        let mut applied = self.applied.lock().unwrap();
        for id in &block.transaction_ids {
            applied.insert(*id);
        }
        Ok(())
    }

    fn add(&self, tx: Transaction) -> bool {
        self.txs.lock().unwrap().insert(tx.id, tx).is_none()
    }
}

/// In-memory chain of accepted blocks with a configurable quorum.
pub struct MemChain {
    blocks: Mutex<Vec<Block>>,
    quorum: Mutex<u32>,
    solved: Mutex<u64>,
}

impl MemChain {
    pub fn new(quorum: u32) -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
            quorum: Mutex::new(quorum),
            solved: Mutex::new(0),
        }
    }

    /// Change the required quorum (e.g. to model split-mode shrinkage).
    pub fn set_quorum(&self, quorum: u32) {
        *self.quorum.lock().unwrap() = quorum;
    }

    pub fn set_solved_count(&self, solved: u64) {
        *self.solved.lock().unwrap() = solved;
    }
}

impl ChainStore for MemChain {
    fn get_by_height(&self, height: u64) -> Result<Option<Block>, StoreError> {
        if height == 0 {
            return Ok(None);
        }
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(height as usize - 1)
            .cloned())
    }

    fn append(&self, block: Block) -> Result<(), StoreError> {
        let mut blocks = self.blocks.lock().unwrap();
        let tip = blocks.len() as u64;
        if block.height != tip + 1 {
            return Err(StoreError::NonContiguousHeight {
                got: block.height,
                tip,
            });
        }
        blocks.push(block);
        Ok(())
    }

    fn last_height(&self) -> u64 {
        self.blocks.lock().unwrap().len() as u64
    }

    fn last_checksum(&self) -> Checksum {
        self.blocks
            .lock()
            .unwrap()
            .last()
            .map(|b| b.block_checksum)
            .unwrap_or(Checksum::ZERO)
    }

    fn required_quorum(&self, _height: u64) -> u32 {
        *self.quorum.lock().unwrap()
    }

    fn refresh_signatures(&self, block: &Block) -> Result<bool, StoreError> {
        let mut blocks = self.blocks.lock().unwrap();
        let stored = blocks
            .iter_mut()
            .find(|b| b.height == block.height)
            .ok_or_else(|| StoreError::NotFound(format!("block #{}", block.height)))?;
        Ok(stored.merge_signatures_from(block))
    }

    fn solved_block_count(&self, _window: u64) -> u64 {
        *self.solved.lock().unwrap()
    }
}

/// In-memory wallet ledger.
#[derive(Default)]
pub struct MemWallets {
    wallets: Mutex<BTreeMap<WalletAddress, WalletInfo>>,
}

impl MemWallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, address: &WalletAddress) -> Amount {
        self.wallet(address).balance
    }
}

impl WalletStore for MemWallets {
    fn wallet(&self, address: &WalletAddress) -> WalletInfo {
        self.wallets
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    fn set_balance(&self, address: &WalletAddress, balance: Amount, nonce: u64) {
        self.wallets
            .lock()
            .unwrap()
            .insert(address.clone(), WalletInfo { balance, nonce });
    }

    fn state_checksum(&self) -> Checksum {
        // Digest over sorted (address, balance, nonce) triples.
        let wallets = self.wallets.lock().unwrap();
        let mut parts: Vec<Vec<u8>> = Vec::with_capacity(wallets.len() * 3);
        for (address, info) in wallets.iter() {
            parts.push(address.as_str().as_bytes().to_vec());
            parts.push(info.balance.raw().to_le_bytes().to_vec());
            parts.push(info.nonce.to_le_bytes().to_vec());
        }
        let slices: Vec<&[u8]> = parts.iter().map(|p| p.as_slice()).collect();
        checksum_multi(&slices)
    }
}

/// A broadcast event recorded instead of sent.
#[derive(Clone, Debug)]
pub enum BroadcastEvent {
    NewBlock(Block),
    GetBlock(u64),
    GetTransaction(TxId),
}

/// A network double that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<BroadcastEvent>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<BroadcastEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Only the blocks announced via `broadcast_new_block`.
    pub fn new_blocks(&self) -> Vec<Block> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BroadcastEvent::NewBlock(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Heights requested via `broadcast_get_block`.
    pub fn block_requests(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BroadcastEvent::GetBlock(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn reset(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast_new_block(&self, block: &Block) {
        self.events
            .lock()
            .unwrap()
            .push(BroadcastEvent::NewBlock(block.clone()));
    }

    fn broadcast_get_block(&self, height: u64) {
        self.events
            .lock()
            .unwrap()
            .push(BroadcastEvent::GetBlock(height));
    }

    fn broadcast_get_transaction(&self, id: &TxId) {
        self.events
            .lock()
            .unwrap()
            .push(BroadcastEvent::GetTransaction(*id));
    }
}

/// An election double with a fixed answer.
pub struct FixedElection {
    local_elected: Mutex<bool>,
    proposer: Mutex<Option<PublicKey>>,
}

impl FixedElection {
    /// An election where the local node is (or is not) always the elected
    /// proposer.
    pub fn new(local_elected: bool) -> Self {
        Self {
            local_elected: Mutex::new(local_elected),
            proposer: Mutex::new(None),
        }
    }

    pub fn set_local_elected(&self, elected: bool) {
        *self.local_elected.lock().unwrap() = elected;
    }

    /// Fix the key reported as the elected proposer for every offset.
    pub fn set_proposer(&self, key: Option<PublicKey>) {
        *self.proposer.lock().unwrap() = key;
    }
}

impl Election for FixedElection {
    fn is_elected_proposer(&self, _offset: u64) -> bool {
        *self.local_elected.lock().unwrap()
    }

    fn elected_proposer_key(&self, _offset: u64) -> Option<PublicKey> {
        self.proposer.lock().unwrap().clone()
    }
}
