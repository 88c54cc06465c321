//! Chain store trait.

use crate::StoreError;
use palisade_types::{Block, Checksum};

/// Trait for the store of accepted blocks.
///
/// Heights are 1-based; height 0 means "no blocks yet". Appending is
/// strictly sequential — finality is monotone and blocks are never
/// un-finalized.
pub trait ChainStore {
    /// Retrieve an accepted block by height.
    fn get_by_height(&self, height: u64) -> Result<Option<Block>, StoreError>;

    /// Append a finalized block at the next height.
    fn append(&self, block: Block) -> Result<(), StoreError>;

    /// Height of the last accepted block (0 when the chain is empty).
    fn last_height(&self) -> u64;

    /// Checksum of the last accepted block (zero when the chain is empty).
    fn last_checksum(&self) -> Checksum;

    /// Distinct signatures required to finalize a block at this height.
    /// May shrink while the network operates in degraded-consensus mode.
    fn required_quorum(&self, height: u64) -> u32;

    /// Merge any new signatures from `block` into the stored block at the
    /// same height. Returns whether the stored signature set changed.
    fn refresh_signatures(&self, block: &Block) -> Result<bool, StoreError>;

    /// Number of solved blocks within the trailing window of `window` most
    /// recent heights — the difficulty controller's feedback input.
    fn solved_block_count(&self, window: u64) -> u64;
}
