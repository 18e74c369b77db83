//! Gaia storage addresses
//!
//! An address is the base58check encoding of `version || hash160(pubkey)`,
//! the same shape as a pay-to-pubkey-hash chain address. Hubs namespace a
//! user's files under it and profiles embed it in per-app bucket URLs.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Version byte for mainnet pay-to-pubkey-hash addresses
pub const MAINNET_ADDRESS_VERSION: u8 = 0x00;
/// Size of a hash160 digest
pub const HASH160_SIZE: usize = 20;

/// `RIPEMD160(SHA256(data))`
pub fn hash160(data: &[u8]) -> [u8; HASH160_SIZE] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; HASH160_SIZE];
    out.copy_from_slice(&ripe);
    out
}

/// Address for the given SEC1-encoded public key bytes.
///
/// The bytes are hashed as given, so a compressed and an uncompressed
/// encoding of the same point yield different addresses.
pub fn address_from_public_key_bytes(public_key: &[u8]) -> String {
    bs58::encode(hash160(public_key))
        .with_check_version(MAINNET_ADDRESS_VERSION)
        .into_string()
}

/// Address for a hex-encoded public key, or `None` if the hex is malformed
pub fn address_from_public_key_hex(public_key: &str) -> Option<String> {
    let bytes = hex::decode(public_key).ok()?;
    Some(address_from_public_key_bytes(&bytes))
}

/// Whether `address` is a well-formed base58check string carrying a
/// hash160 payload
pub fn is_valid_address(address: &str) -> bool {
    match bs58::decode(address).with_check(None).into_vec() {
        // version byte + hash160 (checksum is stripped by the decoder)
        Ok(payload) => payload.len() == 1 + HASH160_SIZE,
        Err(_) => false,
    }
}
