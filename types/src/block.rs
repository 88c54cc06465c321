//! The block record: header fields, signature set, and checksum rules.
//!
//! A block's checksum is computed exactly once, before any signature is
//! attached, and never changes afterwards. Two blocks at the same height
//! with different checksums are distinct competing proposals, not versions
//! of each other — only their signature sets may be merged, and only when
//! the checksums match.

use crate::{Checksum, PublicKey, Signature, TxId};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type Blake2b256 = Blake2b<U32>;

/// A block proposal or finalized block.
///
/// The signature set is keyed by signer public key, so entries are distinct
/// by construction and iterate in a canonical order — the signature-set
/// checksum depends on that order being stable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height in the chain; monotonically increasing, unique once accepted.
    pub height: u64,

    /// Ordered references into the transaction pool.
    pub transaction_ids: Vec<TxId>,

    /// Target difficulty for this height.
    pub difficulty: u64,

    /// Digest of the wallet/ledger state after applying this block.
    pub wallet_state_checksum: Checksum,

    /// Parent linkage — checksum of the previous accepted block.
    pub last_block_checksum: Checksum,

    /// Checksum of the signature set of the target block four heights back,
    /// frozen at proposal time. `None` until enough blocks are finalized.
    pub signature_freeze_checksum: Option<Checksum>,

    /// Digest over all header fields above. Computed once via [`Block::seal`].
    pub block_checksum: Checksum,

    /// Validator signatures over `block_checksum`, keyed by signer.
    pub signatures: BTreeMap<PublicKey, Signature>,
}

impl Block {
    /// Recompute the header checksum from the current field values.
    ///
    /// The signature set is deliberately excluded: signatures accumulate
    /// while the block is a live candidate and must not disturb its identity.
    pub fn compute_checksum(&self) -> Checksum {
        let mut hasher = Blake2b256::new();
        hasher.update(self.height.to_le_bytes());
        hasher.update((self.transaction_ids.len() as u64).to_le_bytes());
        for id in &self.transaction_ids {
            hasher.update(id.as_bytes());
        }
        hasher.update(self.difficulty.to_le_bytes());
        hasher.update(self.wallet_state_checksum.as_bytes());
        hasher.update(self.last_block_checksum.as_bytes());
        match &self.signature_freeze_checksum {
            Some(freeze) => {
                hasher.update([1u8]);
                hasher.update(freeze.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Checksum::new(out)
    }

    /// Compute and store the header checksum. Call exactly once, before any
    /// signature is attached.
    pub fn seal(&mut self) {
        debug_assert!(
            self.signatures.is_empty(),
            "sealing a block that already carries signatures"
        );
        self.block_checksum = self.compute_checksum();
    }

    /// Digest over the current signature set, in canonical signer order.
    ///
    /// This is the value frozen into a later block's
    /// `signature_freeze_checksum`.
    pub fn signature_checksum(&self) -> Checksum {
        let mut hasher = Blake2b256::new();
        hasher.update((self.signatures.len() as u64).to_le_bytes());
        for (public_key, signature) in &self.signatures {
            hasher.update(public_key.as_bytes());
            hasher.update(signature.as_bytes());
        }
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Checksum::new(out)
    }

    /// Attach a signature. Returns `true` if the signer was not already
    /// present (existing entries are never replaced).
    pub fn add_signature(&mut self, signer: PublicKey, signature: Signature) -> bool {
        use std::collections::btree_map::Entry;
        match self.signatures.entry(signer) {
            Entry::Vacant(slot) => {
                slot.insert(signature);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Union another block's signature set into this one.
    ///
    /// Returns `true` if at least one new signer was added. Idempotent:
    /// merging the same set twice changes nothing the second time.
    pub fn merge_signatures_from(&mut self, other: &Block) -> bool {
        let mut grew = false;
        for (signer, signature) in &other.signatures {
            if self.add_signature(signer.clone(), signature.clone()) {
                grew = true;
            }
        }
        grew
    }

    /// Whether the given signer has signed this block.
    pub fn has_signature_from(&self, signer: &PublicKey) -> bool {
        self.signatures.contains_key(signer)
    }

    /// Number of distinct signers.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// Iterate over the distinct signer keys, in canonical order.
    pub fn signer_keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.signatures.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block {
            height: 7,
            transaction_ids: vec![TxId::new([1u8; 32]), TxId::new([2u8; 32])],
            difficulty: 14,
            wallet_state_checksum: Checksum::new([3u8; 32]),
            last_block_checksum: Checksum::new([4u8; 32]),
            signature_freeze_checksum: Some(Checksum::new([5u8; 32])),
            block_checksum: Checksum::ZERO,
            signatures: BTreeMap::new(),
        }
    }

    fn key(n: u8) -> PublicKey {
        PublicKey([n; 32])
    }

    fn sig(n: u8) -> Signature {
        Signature([n; 64])
    }

    #[test]
    fn checksum_is_deterministic() {
        let block = sample_block();
        assert_eq!(block.compute_checksum(), block.compute_checksum());
    }

    #[test]
    fn checksum_changes_with_any_header_field() {
        let base = sample_block().compute_checksum();

        let mut b = sample_block();
        b.height = 8;
        assert_ne!(b.compute_checksum(), base);

        let mut b = sample_block();
        b.transaction_ids.push(TxId::new([9u8; 32]));
        assert_ne!(b.compute_checksum(), base);

        let mut b = sample_block();
        b.difficulty = 15;
        assert_ne!(b.compute_checksum(), base);

        let mut b = sample_block();
        b.signature_freeze_checksum = None;
        assert_ne!(b.compute_checksum(), base);
    }

    #[test]
    fn checksum_ignores_signatures() {
        let mut block = sample_block();
        block.seal();
        let sealed = block.block_checksum;
        block.add_signature(key(1), sig(1));
        assert_eq!(block.compute_checksum(), sealed);
    }

    #[test]
    fn add_signature_rejects_duplicate_signer() {
        let mut block = sample_block();
        assert!(block.add_signature(key(1), sig(1)));
        assert!(!block.add_signature(key(1), sig(2)));
        assert_eq!(block.signature_count(), 1);
        // the original signature wins
        assert_eq!(block.signatures.get(&key(1)), Some(&sig(1)));
    }

    #[test]
    fn merge_is_set_union_and_idempotent() {
        let mut a = sample_block();
        a.add_signature(key(1), sig(1));
        a.add_signature(key(2), sig(2));

        let mut b = sample_block();
        b.add_signature(key(2), sig(2));
        b.add_signature(key(3), sig(3));

        assert!(a.merge_signatures_from(&b));
        assert_eq!(a.signature_count(), 3);

        // repeated merge adds nothing
        assert!(!a.merge_signatures_from(&b));
        assert_eq!(a.signature_count(), 3);
    }

    #[test]
    fn signature_checksum_tracks_the_set() {
        let mut block = sample_block();
        let empty = block.signature_checksum();
        block.add_signature(key(1), sig(1));
        let one = block.signature_checksum();
        assert_ne!(empty, one);

        // insertion order does not matter — the set is canonical
        let mut other = sample_block();
        other.add_signature(key(2), sig(2));
        other.add_signature(key(1), sig(1));
        block.add_signature(key(2), sig(2));
        assert_eq!(block.signature_checksum(), other.signature_checksum());
    }
}
