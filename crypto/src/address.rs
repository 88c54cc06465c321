//! Wallet address derivation from public keys.
//!
//! Address format: `pal_` + base32(public_key, 52 chars) + base32(checksum, 8 chars)
//!
//! Checksum: first 5 bytes of Blake2b-256(public_key).
//! Base32 alphabet avoids visually ambiguous characters (0/O, 2/Z, l/I, v).

use crate::hash::checksum;
use palisade_types::{PublicKey, WalletAddress};

/// Base32 alphabet (32 chars, no ambiguous glyphs).
const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Encode a byte slice as base32 using the palisade alphabet.
fn encode_base32(bytes: &[u8]) -> String {
    let total_bits = bytes.len() * 8;
    let num_chars = total_bits.div_ceil(5);
    let mut result = String::with_capacity(num_chars);

    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits_in_buffer += 8;
        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let idx = ((buffer >> bits_in_buffer) & 0x1F) as usize;
            result.push(BASE32_ALPHABET[idx] as char);
        }
    }
    // Remaining bits, padded with zeros on the right.
    if bits_in_buffer > 0 {
        let idx = ((buffer << (5 - bits_in_buffer)) & 0x1F) as usize;
        result.push(BASE32_ALPHABET[idx] as char);
    }

    result
}

/// Derive a `pal_`-prefixed wallet address from a public key.
pub fn derive_address(public_key: &PublicKey) -> WalletAddress {
    let check = checksum(public_key.as_bytes());
    let mut encoded = String::with_capacity(65);
    encoded.push_str(WalletAddress::PREFIX);
    encoded.push_str(&encode_base32(public_key.as_bytes()));
    encoded.push_str(&encode_base32(&check.as_bytes()[..5]));
    WalletAddress::new(encoded)
}

/// Map a signer key to its payable address, if one exists.
///
/// The all-zero key is a placeholder carried by pre-handshake signer
/// entries and maps to no address.
pub fn payout_address(public_key: &PublicKey) -> Option<WalletAddress> {
    if public_key.is_zero() {
        return None;
    }
    Some(derive_address(public_key))
}
