//! Consensus engine parameters.

use palisade_types::{Amount, WalletAddress};
use serde::{Deserialize, Serialize};

/// Parameters governing proposal timing, difficulty feedback, and fee
/// distribution. Built once at startup (typically from the node's TOML
/// configuration) and shared by every engine component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Seconds between block proposals; also the modulus of the
    /// elected-proposer offset.
    pub generation_interval_secs: u64,

    /// Fixed fee charged per applied transaction, in raw units.
    pub transaction_price: Amount,

    /// Percentage of the fee pool cut for the foundation, floored.
    pub foundation_fee_percent: u64,

    /// Address credited with the foundation cut, division remainders, and
    /// unclaimed signer shares.
    pub foundation_address: WalletAddress,

    /// Trailing window (in heights) over which solved blocks feed the
    /// difficulty controller.
    pub difficulty_window: u64,
}

impl ConsensusParams {
    /// Parameters with protocol defaults and the given foundation address.
    pub fn new(foundation_address: WalletAddress) -> Self {
        Self {
            generation_interval_secs: 30,
            transaction_price: Amount::new(1),
            foundation_fee_percent: 10,
            foundation_address,
            difficulty_window: 1000,
        }
    }
}
