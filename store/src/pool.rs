//! Transaction pool trait.

use crate::StoreError;
use palisade_types::{Block, Transaction, TxId};

/// Trait for the transaction pool consulted by the consensus engine.
///
/// The pool owns transaction storage and indexing; consensus only looks
/// transactions up and marks them applied when a block finalizes.
pub trait TransactionPool {
    /// All transactions not yet applied by an accepted block, in the order
    /// they should be pulled into a proposal.
    fn unapplied(&self) -> Vec<Transaction>;

    /// Look up a single transaction by id.
    fn get(&self, id: &TxId) -> Option<Transaction>;

    /// Mark every transaction referenced by the block as applied.
    fn apply_from_block(&self, block: &Block) -> Result<(), StoreError>;

    /// Add a transaction to the pool. Returns `false` if it was already
    /// present or rejected.
    fn add(&self, tx: Transaction) -> bool;
}
