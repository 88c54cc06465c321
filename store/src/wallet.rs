//! Wallet ledger trait.

use palisade_types::{Amount, Checksum, WalletAddress};

/// Balance and nonce for a single wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalletInfo {
    pub balance: Amount,
    pub nonce: u64,
}

/// Trait for the wallet/balance ledger.
///
/// Consensus re-reads balance and nonce before every mutation — it never
/// assumes a value read earlier is still current.
pub trait WalletStore {
    /// Current balance and nonce for an address (zero for unknown wallets).
    fn wallet(&self, address: &WalletAddress) -> WalletInfo;

    /// Overwrite an address's balance, bumping to the given nonce.
    fn set_balance(&self, address: &WalletAddress, balance: Amount, nonce: u64);

    /// Digest of the entire ledger state, as promised by proposed blocks.
    fn state_checksum(&self) -> Checksum;
}
