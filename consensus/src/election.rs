//! Proposer election trait.

use palisade_types::PublicKey;

/// Deterministic proposer election over the current validator set.
///
/// The offset is `elapsed_seconds_since_proposal_start mod
/// generation_interval`; every honest node evaluating the same offset over
/// the same validator set must elect the same proposer — convergence of
/// competing proposals anchors on the elected proposer's signature.
pub trait Election {
    /// Whether the local node is the elected proposer at this offset.
    fn is_elected_proposer(&self, offset: u64) -> bool;

    /// Public key of the validator elected to propose at this offset.
    ///
    /// `None` when the roster cannot name one (e.g. an empty validator
    /// set); callers treat that as "keep the local candidate".
    fn elected_proposer_key(&self, offset: u64) -> Option<PublicKey>;
}
