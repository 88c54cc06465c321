//! Tick driver for the consensus engine.
//!
//! The engine core is synchronous; this driver gives it a heartbeat. One
//! background task calls `on_update` on a fixed cadence and feeds
//! network-delivered blocks into `on_block_received`, stopping when the
//! shutdown signal fires.

use palisade_consensus::BlockProcessor;
use palisade_types::{Block, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Drives a [`BlockProcessor`] from the tokio runtime.
pub struct ConsensusDriver {
    processor: Arc<BlockProcessor>,
    tick_interval: Duration,
}

impl ConsensusDriver {
    pub fn new(processor: Arc<BlockProcessor>, tick_interval: Duration) -> Self {
        Self {
            processor,
            tick_interval,
        }
    }

    /// Run the tick loop until shutdown.
    ///
    /// `inbound` carries blocks decoded by the transport layer. Engine
    /// calls happen inline on this task — they are non-blocking by
    /// contract, so the loop never stalls the runtime.
    pub async fn run(
        &self,
        mut inbound: mpsc::UnboundedReceiver<Block>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        tracing::info!(tick_ms = self.tick_interval.as_millis() as u64, "consensus driver running");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("consensus driver stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.processor.on_update(Timestamp::now());
                }
                Some(block) = inbound.recv() => {
                    self.processor.on_block_received(block, Timestamp::now());
                }
            }
        }
    }

    /// Spawn the tick loop as a background task.
    pub fn spawn(
        self,
        inbound: mpsc::UnboundedReceiver<Block>,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(inbound, shutdown).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShutdownController;
    use palisade_consensus::testing::{FixedElection, MemChain, MemPool, MemWallets, RecordingBroadcaster};
    use palisade_consensus::ConsensusParams;
    use palisade_crypto::{derive_address, keypair_from_seed};
    use palisade_store::ChainStore;

    fn processor(chain: Arc<MemChain>) -> BlockProcessor {
        let foundation = derive_address(&keypair_from_seed(&[200; 32]).public);
        BlockProcessor::new(
            ConsensusParams::new(foundation),
            keypair_from_seed(&[50; 32]),
            Arc::new(MemPool::new()),
            chain,
            Arc::new(MemWallets::new()),
            Arc::new(FixedElection::new(false)),
            Arc::new(RecordingBroadcaster::new()),
        )
    }

    #[tokio::test]
    async fn ticks_drive_proposal_and_finality() {
        let chain = Arc::new(MemChain::new(1));
        let engine = Arc::new(processor(chain.clone()));
        engine.resume_operation(Timestamp::now());
        engine.force_next_block();

        let shutdown = ShutdownController::new();
        let (_inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let driver = ConsensusDriver::new(engine.clone(), Duration::from_millis(10));
        let handle = driver.spawn(inbound_rx, shutdown.subscribe());

        // First tick proposes; a later tick finalizes at quorum 1.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(chain.last_height(), 1);

        shutdown.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn inbound_blocks_reach_the_engine() {
        let chain = Arc::new(MemChain::new(1));
        let engine = Arc::new(processor(chain.clone()));
        engine.resume_operation(Timestamp::now());

        let shutdown = ShutdownController::new();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        // Slow ticks so adoption observably comes from the inbound path.
        let driver = ConsensusDriver::new(engine.clone(), Duration::from_secs(3600));
        let handle = driver.spawn(inbound_rx, shutdown.subscribe());

        let kp = keypair_from_seed(&[60; 32]);
        let mut block = Block {
            height: 1,
            transaction_ids: Vec::new(),
            difficulty: 14,
            wallet_state_checksum: palisade_types::Checksum::new([1; 32]),
            last_block_checksum: palisade_types::Checksum::ZERO,
            signature_freeze_checksum: None,
            block_checksum: palisade_types::Checksum::ZERO,
            signatures: Default::default(),
        };
        block.seal();
        let sig = palisade_crypto::sign_message(block.block_checksum.as_bytes(), &kp.private);
        block.add_signature(kp.public, sig);

        inbound_tx.send(block.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let candidate = engine.candidate_snapshot().expect("adopted candidate");
        assert_eq!(candidate.block_checksum, block.block_checksum);

        shutdown.shutdown();
        handle.await.unwrap();
    }
}
