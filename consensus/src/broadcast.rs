//! Network broadcast trait.

use palisade_types::{Block, TxId};

/// Fire-and-forget sends to the broadcast network.
///
/// Implementations must not block: the engine calls these while holding its
/// candidate guard, so a send is a queue handoff at most. No delivery
/// status is consumed beyond best-effort logging inside the implementation.
pub trait Broadcaster {
    /// Announce a new or signature-updated block.
    fn broadcast_new_block(&self, block: &Block);

    /// Request an accepted block at the given height from peers.
    fn broadcast_get_block(&self, height: u64);

    /// Request a transaction missing from the local pool.
    fn broadcast_get_transaction(&self, id: &TxId);
}
