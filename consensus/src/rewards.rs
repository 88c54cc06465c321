//! Fee and reward distribution.
//!
//! Rewards for a finalized block are computed against a *target block* a
//! fixed number of heights earlier. The finalized block carries a frozen
//! checksum of the target's signature set, taken at proposal time, so the
//! payout set cannot be altered retroactively: if the target's signatures
//! no longer hash to the frozen value, distribution aborts and a resync is
//! required.

use crate::config::ConsensusParams;
use crate::error::ConsensusError;
use palisade_crypto::payout_address;
use palisade_store::{ChainStore, TransactionPool, WalletStore};
use palisade_types::{Amount, Block, WalletAddress};

/// Heights between a finalized block and its fee-distribution target.
pub const SIGNATURE_FREEZE_LAG: u64 = 4;

/// Accounting summary for one distribution run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardSummary {
    /// Target block height the payout was computed against.
    pub target_height: u64,
    /// Total fee pool before the foundation cut.
    pub total_fees: Amount,
    /// Foundation cut plus division remainder plus unclaimed shares.
    pub foundation_award: Amount,
    /// Award per distinct signer of the target block.
    pub per_signer_award: Amount,
    /// Signers actually credited.
    pub signers_paid: u32,
    /// Shares whose signer had no payable address, redirected to the
    /// foundation.
    pub unclaimed: Amount,
}

/// Applies fee and reward payouts once a block is finalized.
pub struct FeeRewardDistributor {
    params: ConsensusParams,
}

impl FeeRewardDistributor {
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    /// Distribute fees for a freshly finalized block.
    ///
    /// Returns `Ok(None)` when there is nothing to distribute (no freeze
    /// checksum yet, or the target block applied no fee-bearing
    /// transactions). Errors report consistency faults; in every error path
    /// no balance has been mutated.
    pub fn distribute(
        &self,
        finalized: &Block,
        chain: &dyn ChainStore,
        pool: &dyn TransactionPool,
        wallets: &dyn WalletStore,
    ) -> Result<Option<RewardSummary>, ConsensusError> {
        let Some(frozen) = finalized.signature_freeze_checksum else {
            tracing::info!(
                height = finalized.height,
                "block carries no signature freeze checksum, skipping fee distribution"
            );
            return Ok(None);
        };

        let target_height = finalized
            .height
            .checked_sub(SIGNATURE_FREEZE_LAG)
            .filter(|h| *h > 0)
            .ok_or(ConsensusError::MissingTargetBlock {
                height: finalized.height,
            })?;

        let target = chain
            .get_by_height(target_height)?
            .ok_or(ConsensusError::MissingTargetBlock {
                height: target_height,
            })?;

        if target.signature_checksum() != frozen {
            // The target's signatures changed after they were frozen — a
            // resync or reorg is needed before rewards can be trusted.
            return Err(ConsensusError::SignatureFreezeMismatch { target_height });
        }

        // Tally the transactions the target block actually applied.
        let mut total_amount = Amount::ZERO;
        let mut applied_count: u64 = 0;
        for id in &target.transaction_ids {
            if let Some(tx) = pool.get(id) {
                total_amount =
                    total_amount
                        .checked_add(tx.amount)
                        .ok_or(ConsensusError::AmountOverflow {
                            height: target_height,
                        })?;
                applied_count += 1;
            }
        }

        if applied_count == 0 || total_amount.is_zero() {
            return Ok(None);
        }

        let signer_count = target.signature_count() as u64;
        if signer_count == 0 {
            // A finalized block with fee-bearing transactions but no
            // signers is a consistency fault, not a benign case.
            return Err(ConsensusError::NoSigners {
                height: target_height,
            });
        }

        let fee_pool = self
            .params
            .transaction_price
            .checked_mul(applied_count)
            .ok_or(ConsensusError::AmountOverflow {
                height: target_height,
            })?;

        let foundation_cut = fee_pool
            .percent_floor(self.params.foundation_fee_percent)
            .ok_or(ConsensusError::AmountOverflow {
                height: target_height,
            })?;

        let distributable = fee_pool.saturating_sub(foundation_cut);
        let (per_signer, remainder) =
            distributable
                .div_rem(signer_count)
                .ok_or(ConsensusError::NoSigners {
                    height: target_height,
                })?;

        self.credit(wallets, &self.params.foundation_address, foundation_cut);
        tracing::info!(award = %foundation_cut, "awarded foundation fee");

        if !remainder.is_zero() {
            // Division leftovers are never dropped.
            self.credit(wallets, &self.params.foundation_address, remainder);
            tracing::info!(award = %remainder, "awarded division remainder to foundation");
        }

        let mut signers_paid: u32 = 0;
        let mut unclaimed = Amount::ZERO;
        for signer in target.signer_keys() {
            match payout_address(signer) {
                Some(address) => {
                    self.credit(wallets, &address, per_signer);
                    tracing::info!(award = %per_signer, %address, "awarded signer fee");
                    signers_paid += 1;
                }
                None => {
                    // Redirected to the foundation; the summary records it.
                    tracing::warn!(
                        target_height,
                        "signer key has no payable address, share redirected to foundation"
                    );
                    unclaimed = unclaimed.saturating_add(per_signer);
                }
            }
        }
        if !unclaimed.is_zero() {
            self.credit(wallets, &self.params.foundation_address, unclaimed);
        }

        let summary = RewardSummary {
            target_height,
            total_fees: fee_pool,
            foundation_award: foundation_cut
                .saturating_add(remainder)
                .saturating_add(unclaimed),
            per_signer_award: per_signer,
            signers_paid,
            unclaimed,
        };
        tracing::info!(
            target_height,
            total = %summary.total_fees,
            per_signer = %summary.per_signer_award,
            foundation = %summary.foundation_award,
            "fee distribution complete"
        );
        Ok(Some(summary))
    }

    /// Credit an award onto a wallet, re-reading balance and nonce —
    /// balances are never assumed to be cached across calls.
    fn credit(&self, wallets: &dyn WalletStore, address: &WalletAddress, award: Amount) {
        let info = wallets.wallet(address);
        let updated = info.balance.saturating_add(award);
        wallets.set_balance(address, updated, info.nonce);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemChain, MemPool, MemWallets};
    use palisade_crypto::{derive_address, keypair_from_seed};
    use palisade_types::{
        Checksum, PublicKey, Signature, Timestamp, Transaction, TxId, TxType,
    };
    use std::collections::BTreeMap;

    /// Build a target block at height 1 with `tx_count` pool transactions
    /// and one signature per seed, plus a finalized block at height 5 whose
    /// freeze checksum matches the target. Returns (finalized, chain, pool).
    fn fixture(
        tx_count: u8,
        signer_seeds: &[u8],
    ) -> (Block, MemChain, MemPool) {
        let pool = MemPool::new();
        let mut ids = Vec::new();
        for n in 0..tx_count {
            let tx = Transaction {
                id: TxId::new([n + 1; 32]),
                tx_type: TxType::Normal,
                from: derive_address(&keypair_from_seed(&[100; 32]).public),
                to: derive_address(&keypair_from_seed(&[101; 32]).public),
                amount: Amount::new(10),
                timestamp: Timestamp::new(1),
            };
            ids.push(tx.id);
            pool.add(tx);
        }

        let mut target = Block {
            height: 1,
            transaction_ids: ids,
            difficulty: 14,
            wallet_state_checksum: Checksum::ZERO,
            last_block_checksum: Checksum::ZERO,
            signature_freeze_checksum: None,
            block_checksum: Checksum::ZERO,
            signatures: BTreeMap::new(),
        };
        target.seal();
        for seed in signer_seeds {
            let kp = keypair_from_seed(&[*seed; 32]);
            target.add_signature(kp.public, Signature([*seed; 64]));
        }

        let freeze = target.signature_checksum();
        let chain = MemChain::new(2);
        chain.append(target).unwrap();

        let mut finalized = Block {
            height: 5,
            transaction_ids: Vec::new(),
            difficulty: 14,
            wallet_state_checksum: Checksum::ZERO,
            last_block_checksum: Checksum::ZERO,
            signature_freeze_checksum: Some(freeze),
            block_checksum: Checksum::ZERO,
            signatures: BTreeMap::new(),
        };
        finalized.seal();
        (finalized, chain, pool)
    }

    fn params(price: u128, percent: u64) -> ConsensusParams {
        let foundation = derive_address(&keypair_from_seed(&[200; 32]).public);
        let mut p = ConsensusParams::new(foundation);
        p.transaction_price = Amount::new(price);
        p.foundation_fee_percent = percent;
        p
    }

    fn signer_addr(seed: u8) -> WalletAddress {
        derive_address(&keypair_from_seed(&[seed; 32]).public)
    }

    #[test]
    fn even_split_pool_100() {
        // Fee pool 100 (price 50 × 2 txs), foundation 10% → 10; 90 across
        // 3 signers → 30 each, remainder 0.
        let (finalized, chain, pool) = fixture(2, &[1, 2, 3]);
        let wallets = MemWallets::new();
        let p = params(50, 10);
        let foundation = p.foundation_address.clone();

        let summary = FeeRewardDistributor::new(p)
            .distribute(&finalized, &chain, &pool, &wallets)
            .unwrap()
            .unwrap();

        assert_eq!(summary.total_fees, Amount::new(100));
        assert_eq!(summary.foundation_award, Amount::new(10));
        assert_eq!(summary.per_signer_award, Amount::new(30));
        assert_eq!(summary.signers_paid, 3);
        assert_eq!(wallets.balance(&foundation), Amount::new(10));
        for seed in [1, 2, 3] {
            assert_eq!(wallets.balance(&signer_addr(seed)), Amount::new(30));
        }
    }

    #[test]
    fn remainder_goes_to_foundation_pool_101() {
        // Fee pool 101 (price 101 × 1 tx), foundation 10% → floor 10;
        // 91 across 3 signers → 30 each + remainder 1 to the foundation
        // (total foundation 11).
        let (finalized, chain, pool) = fixture(1, &[1, 2, 3]);
        let wallets = MemWallets::new();
        let p = params(101, 10);
        let foundation = p.foundation_address.clone();

        let summary = FeeRewardDistributor::new(p)
            .distribute(&finalized, &chain, &pool, &wallets)
            .unwrap()
            .unwrap();

        assert_eq!(summary.total_fees, Amount::new(101));
        assert_eq!(summary.foundation_award, Amount::new(11));
        assert_eq!(summary.per_signer_award, Amount::new(30));
        assert_eq!(wallets.balance(&foundation), Amount::new(11));
    }

    #[test]
    fn value_is_conserved() {
        for (price, tx_count, signers) in [
            (1u128, 1u8, 1usize),
            (7, 3, 2),
            (101, 1, 3),
            (99, 5, 7),
            (1_000_003, 4, 11),
        ] {
            let seeds: Vec<u8> = (1..=signers as u8).collect();
            let (finalized, chain, pool) = fixture(tx_count, &seeds);
            let wallets = MemWallets::new();

            let summary = FeeRewardDistributor::new(params(price, 10))
                .distribute(&finalized, &chain, &pool, &wallets)
                .unwrap()
                .unwrap();

            let distributed = summary
                .per_signer_award
                .checked_mul(summary.signers_paid as u64)
                .unwrap()
                .checked_add(summary.foundation_award)
                .unwrap();
            assert_eq!(distributed, summary.total_fees);
        }
    }

    #[test]
    fn no_transactions_means_no_mutation() {
        let (finalized, chain, pool) = fixture(0, &[1, 2, 3]);
        let wallets = MemWallets::new();
        let before = wallets.state_checksum();

        let result = FeeRewardDistributor::new(params(50, 10))
            .distribute(&finalized, &chain, &pool, &wallets)
            .unwrap();

        assert!(result.is_none());
        assert_eq!(wallets.state_checksum(), before);
    }

    #[test]
    fn missing_freeze_checksum_skips() {
        let (mut finalized, chain, pool) = fixture(2, &[1, 2]);
        finalized.signature_freeze_checksum = None;
        let wallets = MemWallets::new();

        let result = FeeRewardDistributor::new(params(50, 10))
            .distribute(&finalized, &chain, &pool, &wallets)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn freeze_mismatch_aborts_without_mutation() {
        let (finalized, chain, pool) = fixture(2, &[1, 2, 3]);
        let wallets = MemWallets::new();
        let before = wallets.state_checksum();

        // Grow the stored target's signature set after the freeze.
        let target = chain.get_by_height(1).unwrap().unwrap();
        let mut updated = target.clone();
        let kp = keypair_from_seed(&[9; 32]);
        updated.add_signature(kp.public, Signature([9; 64]));
        chain.refresh_signatures(&updated).unwrap();

        let result =
            FeeRewardDistributor::new(params(50, 10)).distribute(&finalized, &chain, &pool, &wallets);

        assert!(matches!(
            result,
            Err(ConsensusError::SignatureFreezeMismatch { target_height: 1 })
        ));
        assert_eq!(wallets.state_checksum(), before);
    }

    #[test]
    fn zero_signers_is_a_consistency_fault() {
        let (finalized, chain, pool) = fixture(2, &[]);
        let wallets = MemWallets::new();

        let result =
            FeeRewardDistributor::new(params(50, 10)).distribute(&finalized, &chain, &pool, &wallets);
        assert!(matches!(
            result,
            Err(ConsensusError::NoSigners { height: 1 })
        ));
    }

    #[test]
    fn unpayable_signer_share_redirected_to_foundation() {
        // Two payable signers plus the all-zero placeholder key.
        let (finalized, chain, pool) = fixture(2, &[1, 2]);
        let target = chain.get_by_height(1).unwrap().unwrap();
        let mut with_placeholder = target.clone();
        with_placeholder.add_signature(PublicKey::ZERO, Signature([0; 64]));
        chain.refresh_signatures(&with_placeholder).unwrap();

        // Re-freeze against the updated set.
        let stored = chain.get_by_height(1).unwrap().unwrap();
        let mut finalized = finalized;
        finalized.signature_freeze_checksum = Some(stored.signature_checksum());

        let wallets = MemWallets::new();
        let p = params(60, 10);
        let foundation = p.foundation_address.clone();

        // Pool 120, foundation 12, 108 across 3 signers → 36 each; the
        // placeholder's 36 lands on the foundation.
        let summary = FeeRewardDistributor::new(p)
            .distribute(&finalized, &chain, &pool, &wallets)
            .unwrap()
            .unwrap();

        assert_eq!(summary.per_signer_award, Amount::new(36));
        assert_eq!(summary.signers_paid, 2);
        assert_eq!(summary.unclaimed, Amount::new(36));
        assert_eq!(wallets.balance(&foundation), Amount::new(48));
    }
}
