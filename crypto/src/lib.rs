//! Cryptographic primitives for the palisade ledger.
//!
//! Thin wrappers over `ed25519-dalek` (signing) and `blake2` (digests),
//! plus `pal_` wallet address derivation. Everything here is deterministic
//! given its inputs; key generation is the only entry point that touches
//! the OS random source.

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{derive_address, payout_address};
pub use hash::{checksum, checksum_multi};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
