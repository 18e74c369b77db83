//! Cryptographic primitives for the Gaia client
//!
//! This module provides the cryptographic foundation for file confidentiality,
//! file integrity, and hub authorization:
//!
//! - **Identity**: secp256k1 keypairs (`SecretKey`/`PublicKey`) owned by the app
//! - **Addresses**: base58check hash160 addresses that namespace files on a hub
//! - **Encryption**: ECIES (ECDH + AES-256-CBC + HMAC-SHA256) into a `CipherObject`
//! - **Signatures**: detached, DER-encoded ECDSA over SHA-256
//!
//! # Security Model
//!
//! ## Content Encryption
//! Every encryption draws a fresh ephemeral keypair and IV. The MAC covers the
//! IV, the ephemeral public key, and the cipher text, and is checked in constant
//! time before any decryption happens.
//!
//! ## Content Signing
//! Signatures bind content to a public key. Callers must additionally check that
//! the key's address is the address they expect; a valid signature from the
//! wrong key proves nothing.

mod address;
mod ecies;
mod keys;
mod signature;

pub use address::{
    address_from_public_key_bytes, address_from_public_key_hex, hash160, is_valid_address,
};
pub use ecies::{
    decrypt_ecies, encrypt_ecies, equal_constant_time, CipherObject, CipherTextEncoding,
    EciesError,
};
pub use k256::ecdsa::Signature;
pub use keys::{KeyError, PublicKey, SecretKey};
pub use signature::{
    encode_script_signature, sign_ecdsa, strip_hash_type, verify_ecdsa, SignatureError,
    SignatureObject, SignedCipherObject, SIGHASH_ALL,
};
