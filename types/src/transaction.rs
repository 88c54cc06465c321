//! Transaction value as seen by the consensus engine.
//!
//! The wire layout and pool indexing of transactions belong to the protocol
//! and pool layers; consensus only needs the fields below.

use crate::{Amount, Timestamp, TxId, WalletAddress};
use serde::{Deserialize, Serialize};

/// The kind of transfer a transaction represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    /// An ordinary value transfer between wallets.
    Normal,
    /// A fee/reward payout minted by the consensus engine.
    FeeReward,
}

/// A transaction referenced by blocks and held in the pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub tx_type: TxType,
    pub from: WalletAddress,
    pub to: WalletAddress,
    pub amount: Amount,
    pub timestamp: Timestamp,
}

impl Transaction {
    /// Whether this transaction debits its sender (only `Normal` transfers
    /// count toward spend verification).
    pub fn is_normal(&self) -> bool {
        self.tx_type == TxType::Normal
    }
}
