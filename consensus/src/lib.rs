//! Block consensus for the palisade ledger.
//!
//! A replicated state machine with no central coordinator: every validator
//! proposes blocks when elected, merges competing signature sets arriving
//! in arbitrary order, and finalizes a block once it carries the required
//! quorum of distinct validator signatures. Degraded-consensus ("split")
//! mode keeps the chain progressing through partial network partitions.
//!
//! ## Module overview
//!
//! - [`processor`] — The top-level state machine driving proposal timing,
//!   signature merging, and finality.
//! - [`verifier`] — Pure validation of candidate blocks against pool and
//!   ledger state.
//! - [`difficulty`] — Damped linear-feedback difficulty controller.
//! - [`rewards`] — Fee/reward distribution against the signature-frozen
//!   target block.
//! - [`election`] / [`broadcast`] — Collaborator traits for proposer
//!   election and fire-and-forget network sends.
//! - [`config`] — Engine parameters.
//! - [`testing`] — Deterministic in-memory collaborators for tests.

pub mod broadcast;
pub mod config;
pub mod difficulty;
pub mod election;
pub mod error;
pub mod processor;
pub mod rewards;
pub mod testing;
pub mod verifier;

pub use broadcast::Broadcaster;
pub use config::ConsensusParams;
pub use difficulty::{DifficultyAdjuster, BASELINE_DIFFICULTY, MAX_DIFFICULTY};
pub use election::Election;
pub use error::ConsensusError;
pub use processor::{BlockProcessor, ProcessorPhase};
pub use rewards::{FeeRewardDistributor, RewardSummary, SIGNATURE_FREEZE_LAG};
pub use verifier::{BlockVerifier, VerifyStatus};
