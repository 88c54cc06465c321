//! Candidate block verification.
//!
//! Pure validation against pool and ledger state — no candidate, pool, or
//! ledger mutation. The one permitted side effect is requesting missing
//! transactions from the network.

use crate::broadcast::Broadcaster;
use palisade_crypto::verify_signature;
use palisade_store::{TransactionPool, WalletStore};
use palisade_types::{Amount, Block, WalletAddress};
use std::collections::HashMap;

/// Outcome of verifying a candidate block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyStatus {
    /// Every check passed against current pool/ledger state.
    Valid,
    /// The block is provably malformed and must be discarded.
    Invalid(String),
    /// At least one referenced transaction is not in the pool yet; a fetch
    /// has been requested. Never a definitive rejection.
    Indeterminate,
}

/// Validates candidate blocks.
pub struct BlockVerifier {
    /// Whether to verify Ed25519 signatures. Disabled in tests that build
    /// blocks with synthetic signature bytes.
    verify_signatures: bool,
}

impl Default for BlockVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockVerifier {
    pub fn new() -> Self {
        Self {
            verify_signatures: true,
        }
    }

    /// Disable Ed25519 signature verification (for tests with synthetic
    /// signatures).
    pub fn set_verify_signatures(&mut self, verify: bool) {
        self.verify_signatures = verify;
    }

    /// Verify a block against the pool and ledger.
    ///
    /// Check order matters for which error is surfaced: a debit overflow is
    /// a poison signal and short-circuits to `Invalid` before missing
    /// transactions can soften the outcome to `Indeterminate`.
    pub fn verify(
        &self,
        block: &Block,
        pool: &dyn TransactionPool,
        wallets: &dyn WalletStore,
        network: &dyn Broadcaster,
    ) -> VerifyStatus {
        let mut has_all_transactions = true;
        let mut debits: HashMap<WalletAddress, Amount> = HashMap::new();

        for id in &block.transaction_ids {
            let Some(tx) = pool.get(id) else {
                tracing::info!(tx_id = %id, "missing transaction, requesting from network");
                network.broadcast_get_transaction(id);
                has_all_transactions = false;
                continue;
            };
            if !tx.is_normal() {
                continue;
            }
            let debit = debits.entry(tx.from.clone()).or_insert(Amount::ZERO);
            match debit.checked_add(tx.amount) {
                Some(total) => *debit = total,
                None => {
                    // A legitimate block can never contain an overflowing
                    // debit total.
                    tracing::warn!(
                        tx_id = %tx.id,
                        from = %tx.from,
                        amount = %tx.amount,
                        "debit accumulation overflowed"
                    );
                    return VerifyStatus::Invalid(format!(
                        "debit overflow caused by transaction {}",
                        tx.id
                    ));
                }
            }
        }

        for (address, debit) in &debits {
            let balance = wallets.wallet(address).balance;
            if balance < *debit {
                tracing::warn!(
                    %address,
                    %balance,
                    outgoing = %debit,
                    "overspend attempt"
                );
                return VerifyStatus::Invalid(format!("address {} is overspending", address));
            }
        }

        if !has_all_transactions {
            tracing::info!(
                height = block.height,
                "block is missing transactions, requested from the network"
            );
            return VerifyStatus::Indeterminate;
        }

        let recomputed = block.compute_checksum();
        if recomputed != block.block_checksum {
            tracing::warn!(
                height = block.height,
                stored = %block.block_checksum,
                %recomputed,
                "block checksum mismatch"
            );
            return VerifyStatus::Invalid("block checksum mismatch".into());
        }

        if self.verify_signatures {
            for (signer, signature) in &block.signatures {
                if !verify_signature(block.block_checksum.as_bytes(), signature, signer) {
                    tracing::warn!(height = block.height, "invalid signature on block");
                    return VerifyStatus::Invalid("invalid signature on block".into());
                }
            }
        }

        VerifyStatus::Valid
    }
}
