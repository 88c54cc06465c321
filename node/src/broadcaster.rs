//! Channel-backed outbound broadcaster.
//!
//! The consensus engine calls the [`Broadcaster`] trait while holding its
//! candidate guard, so sends must never block. This implementation hands
//! each message to an unbounded channel; the transport layer drains the
//! receiving end and owns wire encoding and peer fan-out.

use palisade_consensus::Broadcaster;
use palisade_types::{Block, TxId};
use tokio::sync::mpsc;

/// A message queued for the transport layer.
#[derive(Clone, Debug)]
pub enum OutboundMessage {
    /// Announce a new or signature-updated block.
    NewBlock(Block),
    /// Ask peers for an accepted block at the given height.
    GetBlock(u64),
    /// Ask peers for a transaction missing from the pool.
    GetTransaction(TxId),
}

/// Fire-and-forget broadcaster backed by an unbounded mpsc channel.
pub struct ChannelBroadcaster {
    outbound: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelBroadcaster {
    /// Create a broadcaster and the receiver the transport layer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }

    fn send(&self, message: OutboundMessage) {
        // A closed channel means the transport is shutting down.
        if self.outbound.send(message).is_err() {
            tracing::debug!("outbound channel closed, dropping broadcast");
        }
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn broadcast_new_block(&self, block: &Block) {
        self.send(OutboundMessage::NewBlock(block.clone()));
    }

    fn broadcast_get_block(&self, height: u64) {
        self.send(OutboundMessage::GetBlock(height));
    }

    fn broadcast_get_transaction(&self, id: &TxId) {
        self.send(OutboundMessage::GetTransaction(*id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_arrive_in_order() {
        let (broadcaster, mut rx) = ChannelBroadcaster::new();
        broadcaster.broadcast_get_block(3);
        broadcaster.broadcast_get_transaction(&TxId::new([1; 32]));

        assert!(matches!(rx.try_recv(), Ok(OutboundMessage::GetBlock(3))));
        assert!(matches!(
            rx.try_recv(),
            Ok(OutboundMessage::GetTransaction(_))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (broadcaster, rx) = ChannelBroadcaster::new();
        drop(rx);
        broadcaster.broadcast_get_block(1);
    }
}
