//! Blake2b-256 hashing.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use palisade_types::Checksum;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b checksum of arbitrary data.
pub fn checksum(data: &[u8]) -> Checksum {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    finalize(hasher)
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn checksum_multi(parts: &[&[u8]]) -> Checksum {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    finalize(hasher)
}

fn finalize(hasher: Blake2b256) -> Checksum {
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Checksum::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_deterministic() {
        assert_eq!(checksum(b"hello palisade"), checksum(b"hello palisade"));
    }

    #[test]
    fn checksum_different_inputs() {
        assert_ne!(checksum(b"hello"), checksum(b"world"));
    }

    #[test]
    fn checksum_empty_is_not_zero() {
        assert!(!checksum(b"").is_zero());
    }

    #[test]
    fn checksum_multi_equivalent_to_concat() {
        assert_eq!(checksum(b"helloworld"), checksum_multi(&[b"hello", b"world"]));
    }
}
