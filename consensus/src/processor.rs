//! The block-consensus state machine.
//!
//! One `BlockProcessor` instance per node. An external scheduler calls
//! [`BlockProcessor::on_update`] once per tick; the network layer delivers
//! verified-on-arrival proposals through
//! [`BlockProcessor::on_block_received`] from its own execution contexts.
//! Every read or write of the candidate block and proposal timer happens
//! under a single mutex, and nothing blocking ever runs inside that
//! critical section — broadcasts are fire-and-forget queue handoffs.

use crate::broadcast::Broadcaster;
use crate::config::ConsensusParams;
use crate::difficulty::DifficultyAdjuster;
use crate::election::Election;
use crate::rewards::{FeeRewardDistributor, SIGNATURE_FREEZE_LAG};
use crate::verifier::{BlockVerifier, VerifyStatus};
use palisade_crypto::sign_message;
use palisade_store::{ChainStore, TransactionPool, WalletStore};
use palisade_types::{Amount, Block, Checksum, KeyPair, Timestamp};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Observable phase of the consensus engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessorPhase {
    /// Not participating (startup or resync).
    Idle,
    /// No candidate in progress; waiting for this node's proposal turn or
    /// a remote proposal.
    Proposing,
    /// A candidate exists but its signature count is below quorum.
    AwaitingConsensus,
    /// The candidate has reached quorum and will finalize on the next tick.
    Finalizing,
}

/// Candidate bookkeeping, guarded by the processor's mutex.
struct CandidateState {
    /// The single in-progress proposal for the next height.
    candidate: Option<Block>,
    /// When the current candidate height began. `None` pauses the proposal
    /// timer (the only cancellation primitive).
    proposal_start: Option<Timestamp>,
    /// First height at which degraded-consensus mode was entered. Sticky
    /// until `resume_operation`.
    split_height: Option<u64>,
}

/// The top-level consensus state machine.
pub struct BlockProcessor {
    params: ConsensusParams,
    keypair: KeyPair,
    verifier: BlockVerifier,
    difficulty: DifficultyAdjuster,
    rewards: FeeRewardDistributor,
    pool: Arc<dyn TransactionPool + Send + Sync>,
    chain: Arc<dyn ChainStore + Send + Sync>,
    wallets: Arc<dyn WalletStore + Send + Sync>,
    election: Arc<dyn Election + Send + Sync>,
    network: Arc<dyn Broadcaster + Send + Sync>,
    state: Mutex<CandidateState>,
    operating: AtomicBool,
    force_generate: AtomicBool,
}

impl BlockProcessor {
    pub fn new(
        params: ConsensusParams,
        keypair: KeyPair,
        pool: Arc<dyn TransactionPool + Send + Sync>,
        chain: Arc<dyn ChainStore + Send + Sync>,
        wallets: Arc<dyn WalletStore + Send + Sync>,
        election: Arc<dyn Election + Send + Sync>,
        network: Arc<dyn Broadcaster + Send + Sync>,
    ) -> Self {
        let difficulty = DifficultyAdjuster::new(params.difficulty_window);
        let rewards = FeeRewardDistributor::new(params.clone());
        Self {
            params,
            keypair,
            verifier: BlockVerifier::new(),
            difficulty,
            rewards,
            pool,
            chain,
            wallets,
            election,
            network,
            state: Mutex::new(CandidateState {
                candidate: None,
                proposal_start: None,
                split_height: None,
            }),
            operating: AtomicBool::new(false),
            force_generate: AtomicBool::new(false),
        }
    }

    /// Disable Ed25519 signature verification (for tests building blocks
    /// with synthetic signatures). Call before sharing the processor.
    pub fn set_verify_signatures(&mut self, verify: bool) {
        self.verifier.set_verify_signatures(verify);
    }

    /// Begin participating in consensus. Resets the proposal timer and any
    /// recorded split height.
    pub fn resume_operation(&self, now: Timestamp) {
        tracing::info!("block processor resuming normal operation");
        let mut state = self.state();
        state.proposal_start = Some(now);
        state.split_height = None;
        self.operating.store(true, Ordering::Release);
    }

    pub fn is_operating(&self) -> bool {
        self.operating.load(Ordering::Acquire)
    }

    /// Request that the next tick proposes a block regardless of election
    /// and timing.
    pub fn force_next_block(&self) {
        self.force_generate.store(true, Ordering::Release);
    }

    /// Guard-scoped clone of the in-progress candidate, if any. External
    /// components never reason about the internal guard.
    pub fn candidate_snapshot(&self) -> Option<Block> {
        self.state().candidate.clone()
    }

    pub fn has_candidate(&self) -> bool {
        self.state().candidate.is_some()
    }

    /// First height at which degraded-consensus mode was entered, if any.
    pub fn split_height(&self) -> Option<u64> {
        self.state().split_height
    }

    /// Current engine phase, for operators and tests.
    pub fn phase(&self) -> ProcessorPhase {
        if !self.is_operating() {
            return ProcessorPhase::Idle;
        }
        let state = self.state();
        match state.candidate.as_ref() {
            None => ProcessorPhase::Proposing,
            Some(candidate) => {
                let required = self.chain.required_quorum(candidate.height);
                if candidate.signature_count() as u32 >= required {
                    ProcessorPhase::Finalizing
                } else {
                    ProcessorPhase::AwaitingConsensus
                }
            }
        }
    }

    /// One scheduler tick: propose when it is this node's turn, otherwise
    /// check the pending candidate for quorum.
    pub fn on_update(&self, now: Timestamp) {
        if !self.is_operating() {
            return;
        }

        let mut state = self.state();
        let elapsed = state
            .proposal_start
            .map(|start| start.elapsed_since(now))
            .unwrap_or(0);
        let offset = elapsed % self.params.generation_interval_secs;

        let elected = self.election.is_elected_proposer(offset)
            && elapsed > self.params.generation_interval_secs;
        let forced = self.force_generate.load(Ordering::Acquire);

        if elected || forced {
            if forced {
                tracing::info!("forcing new block generation");
                self.force_generate.store(false, Ordering::Release);
            }
            self.generate_new_block(&mut state, now);
        } else {
            self.verify_block_acceptance(&mut state);
        }
    }

    /// Handle a block delivered from the network.
    pub fn on_block_received(&self, block: Block, now: Timestamp) {
        if !self.is_operating() {
            return;
        }
        tracing::info!(
            height = block.height,
            signatures = block.signature_count(),
            "received block from the network"
        );

        match self.verifier.verify(
            &block,
            self.pool.as_ref(),
            self.wallets.as_ref(),
            self.network.as_ref(),
        ) {
            VerifyStatus::Invalid(reason) => {
                tracing::warn!(height = block.height, %reason, "received invalid block");
                return;
            }
            VerifyStatus::Indeterminate => {
                // Fetches were already requested; the block will come back.
                tracing::info!(height = block.height, "block incomplete, awaiting transactions");
                return;
            }
            VerifyStatus::Valid => {}
        }

        let last_height = self.chain.last_height();

        if block.height <= last_height {
            self.accumulate_finalized_signatures(&block);
            return;
        }

        if block.height > last_height + 1 {
            tracing::warn!(
                height = block.height,
                expected = last_height + 1,
                "gap detected, requesting missing blocks"
            );
            for missing in (last_height + 1)..block.height {
                self.network.broadcast_get_block(missing);
            }
            return;
        }

        // block.height == last_height + 1 — the height being worked on.
        let mut state = self.state();
        self.merge_received_block(&mut state, block, now);
    }

    // ── Internal operations (all run under the candidate guard) ─────────

    fn state(&self) -> MutexGuard<'_, CandidateState> {
        // Candidate state stays consistent across panics, so a poisoned
        // lock is recoverable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Merge new signatures for an already-finalized height into the chain
    /// store and propagate the richer set.
    fn accumulate_finalized_signatures(&self, block: &Block) {
        match self.chain.refresh_signatures(block) {
            Ok(true) => {
                if let Ok(Some(stored)) = self.chain.get_by_height(block.height) {
                    tracing::info!(
                        height = block.height,
                        signatures = stored.signature_count(),
                        "finalized block gained signatures, re-broadcasting"
                    );
                    self.network.broadcast_new_block(&stored);
                }
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(height = block.height, error = %e, "signature refresh failed");
            }
        }
    }

    /// Resolve an incoming proposal for the current working height against
    /// the local candidate, then make sure our own signature rides on the
    /// survivor.
    fn merge_received_block(&self, state: &mut CandidateState, block: Block, now: Timestamp) {
        let offset = state
            .proposal_start
            .map(|start| start.elapsed_since(now) % self.params.generation_interval_secs)
            .unwrap_or(0);

        if let Some(local) = state.candidate.as_mut() {
            if local.block_checksum == block.block_checksum {
                // Same proposal, different signer set.
                tracing::info!(height = block.height, "merging signatures into local candidate");
                if local.merge_signatures_from(&block) {
                    tracing::info!(
                        height = local.height,
                        signatures = local.signature_count(),
                        "signature count increased, re-transmitting"
                    );
                    self.network.broadcast_new_block(local);
                } else if local.signature_count() != block.signature_count() {
                    // A stale re-send; answer with the superior set.
                    tracing::info!(
                        height = local.height,
                        signatures = local.signature_count(),
                        "received stale signature set, re-transmitting local block"
                    );
                    self.network.broadcast_new_block(local);
                }
            } else {
                // A genuinely different proposal for the same height.
                // Convergence anchors on the elected proposer's signature,
                // never on signature counts.
                let elected_signed = self
                    .election
                    .elected_proposer_key(offset)
                    .map(|key| block.has_signature_from(&key))
                    .unwrap_or(false);
                if elected_signed {
                    tracing::info!(
                        height = block.height,
                        signatures = block.signature_count(),
                        "incoming block carries the elected proposer's signature, adopting"
                    );
                    *local = block;
                } else {
                    tracing::info!(
                        height = block.height,
                        "incoming block lacks the elected proposer's signature, re-transmitting ours"
                    );
                    self.network.broadcast_new_block(local);
                }
            }
        } else {
            // No local candidate yet — the incoming block becomes the
            // reference point for proposal timing.
            state.proposal_start = Some(now);
            state.candidate = Some(block);
        }

        if let Some(candidate) = state.candidate.as_mut() {
            if !candidate.has_signature_from(&self.keypair.public) {
                let signature =
                    sign_message(candidate.block_checksum.as_bytes(), &self.keypair.private);
                candidate.add_signature(self.keypair.public.clone(), signature);
                self.network.broadcast_new_block(candidate);
            }
        }
    }

    /// Propose a new block, or recover from a stalled candidate.
    fn generate_new_block(&self, state: &mut CandidateState, now: Timestamp) {
        if let Some(candidate) = state.candidate.as_ref() {
            let current_height = candidate.height;
            let expected_height = self.chain.last_height() + 1;

            if current_height == expected_height {
                // Still the right height, but not yet converged.
                let elapsed = state
                    .proposal_start
                    .map(|start| start.elapsed_since(now))
                    .unwrap_or(0);
                if elapsed >= 2 * self.params.generation_interval_secs {
                    // Two full generation cycles without consensus: assume
                    // a network split or a mass node drop and keep going at
                    // the degraded threshold.
                    let split_height = *state.split_height.get_or_insert(current_height);
                    let required = self.chain.required_quorum(current_height);
                    tracing::warn!(
                        height = current_height,
                        split_height,
                        required,
                        "unable to reach consensus, assuming split mode"
                    );
                    if (candidate.signature_count() as u32) < required {
                        tracing::error!(
                            height = current_height,
                            signatures = candidate.signature_count(),
                            required,
                            "below degraded threshold, node may be isolated; pausing proposals"
                        );
                    }
                    state.proposal_start = None;
                } else {
                    tracing::warn!(
                        height = current_height,
                        "taking too long to reach consensus, re-broadcasting candidate"
                    );
                    self.network.broadcast_new_block(candidate);
                }
            } else if current_height < expected_height {
                // Someone else's block finalized at or above this height.
                tracing::error!(
                    height = current_height,
                    expected = expected_height,
                    "candidate already accepted elsewhere, lagging behind the network"
                );
                state.candidate = None;
                state.proposal_start = None;
            } else {
                // Must never happen — height bookkeeping is broken.
                tracing::error!(
                    height = current_height,
                    expected = expected_height,
                    "candidate height ahead of chain, clearing state"
                );
                state.candidate = None;
                state.proposal_start = None;
            }
            return;
        }

        let height = self.chain.last_height() + 1;
        let signature_freeze_checksum = self.signature_freeze_checksum(height);

        let transactions = self.pool.unapplied();
        let mut total_amount = Amount::ZERO;
        let transaction_ids = transactions
            .iter()
            .map(|tx| {
                total_amount = total_amount.saturating_add(tx.amount);
                tx.id
            })
            .collect();

        let previous = match self.chain.get_by_height(height.saturating_sub(1)) {
            Ok(previous) => previous,
            Err(e) => {
                tracing::error!(height, error = %e, "chain store failed, skipping proposal");
                return;
            }
        };
        let solved = self
            .chain
            .solved_block_count(self.difficulty.window_size());
        let difficulty = self.difficulty.next(previous.as_ref(), solved);

        let mut block = Block {
            height,
            transaction_ids,
            difficulty,
            wallet_state_checksum: self.wallets.state_checksum(),
            last_block_checksum: self.chain.last_checksum(),
            signature_freeze_checksum,
            block_checksum: Checksum::ZERO,
            signatures: BTreeMap::new(),
        };
        block.seal();
        let signature = sign_message(block.block_checksum.as_bytes(), &self.keypair.private);
        block.add_signature(self.keypair.public.clone(), signature);

        tracing::info!(
            height,
            transactions = block.transaction_ids.len(),
            amount = %total_amount,
            difficulty,
            checksum = %block.block_checksum,
            "proposing new block"
        );

        self.network.broadcast_new_block(&block);
        state.candidate = Some(block);
        state.proposal_start = Some(now);
    }

    /// Freeze checksum for a proposal at `height`: the signature-set digest
    /// of the block four heights back, or `None` until at least five blocks
    /// are finalized.
    fn signature_freeze_checksum(&self, height: u64) -> Option<Checksum> {
        if self.chain.last_height() < SIGNATURE_FREEZE_LAG + 1 {
            return None;
        }
        let target_height = height.checked_sub(SIGNATURE_FREEZE_LAG)?;
        match self.chain.get_by_height(target_height) {
            Ok(Some(target)) => Some(target.signature_checksum()),
            Ok(None) => {
                tracing::warn!(target_height, "freeze target block missing");
                None
            }
            Err(e) => {
                tracing::warn!(target_height, error = %e, "freeze target lookup failed");
                None
            }
        }
    }

    /// Re-validate the candidate and finalize it once quorum is met.
    fn verify_block_acceptance(&self, state: &mut CandidateState) {
        let Some(candidate) = state.candidate.as_ref() else {
            return;
        };

        match self.verifier.verify(
            candidate,
            self.pool.as_ref(),
            self.wallets.as_ref(),
            self.network.as_ref(),
        ) {
            VerifyStatus::Valid => {
                let required = self.chain.required_quorum(candidate.height);
                if candidate.signature_count() as u32 >= required {
                    self.finalize_candidate(state);
                }
            }
            VerifyStatus::Invalid(reason) => {
                // The candidate went stale against newer ledger state.
                // Discard it; the timer keeps running so the next elected
                // tick regenerates from fresh state.
                tracing::warn!(
                    height = candidate.height,
                    %reason,
                    "candidate no longer valid, discarding"
                );
                state.candidate = None;
            }
            VerifyStatus::Indeterminate => {}
        }
    }

    /// Finality: apply transactions, append to the chain, distribute fees,
    /// clear the candidate.
    fn finalize_candidate(&self, state: &mut CandidateState) {
        let Some(block) = state.candidate.take() else {
            return;
        };

        if let Err(e) = self.pool.apply_from_block(&block) {
            tracing::error!(height = block.height, error = %e, "failed to apply transactions");
            state.candidate = Some(block);
            return;
        }
        if let Err(e) = self.chain.append(block.clone()) {
            tracing::error!(height = block.height, error = %e, "failed to append block");
            return;
        }
        tracing::info!(
            height = block.height,
            signatures = block.signature_count(),
            "accepted block"
        );

        match self.rewards.distribute(
            &block,
            self.chain.as_ref(),
            self.pool.as_ref(),
            self.wallets.as_ref(),
        ) {
            Ok(Some(summary)) => {
                tracing::info!(
                    target_height = summary.target_height,
                    total = %summary.total_fees,
                    per_signer = %summary.per_signer_award,
                    "fee rewards applied"
                );
            }
            Ok(None) => {}
            Err(e) => {
                // Reported, not retried — a freeze violation needs a resync
                // the engine does not perform itself.
                tracing::error!(height = block.height, error = %e, "fee distribution failed");
            }
        }
    }
}
