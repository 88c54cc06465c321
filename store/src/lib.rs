//! Abstract storage traits for the palisade ledger.
//!
//! Every backend (persistent stores in the daemon, in-memory stores for
//! testing) implements these traits. The consensus engine depends only on
//! the traits, never on a concrete backend.

pub mod chain;
pub mod error;
pub mod pool;
pub mod wallet;

pub use chain::ChainStore;
pub use error::StoreError;
pub use pool::TransactionPool;
pub use wallet::{WalletInfo, WalletStore};
