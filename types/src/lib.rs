//! Fundamental types for the palisade ledger.
//!
//! This crate defines the core values shared across every other crate in the
//! workspace: checksums, transaction ids, keys, signatures, amounts,
//! addresses, timestamps, transactions, and the block record itself.

pub mod address;
pub mod amount;
pub mod block;
pub mod hash;
pub mod keys;
pub mod time;
pub mod transaction;

pub use address::WalletAddress;
pub use amount::Amount;
pub use block::Block;
pub use hash::{Checksum, TxId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;
pub use transaction::{Transaction, TxType};
