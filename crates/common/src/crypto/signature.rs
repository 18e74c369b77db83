//! Detached ECDSA signatures over content
//!
//! Content is hashed with SHA-256 and signed with secp256k1 ECDSA. Signatures
//! travel DER-encoded as hex alongside the signer's compressed public key.

use k256::ecdsa::signature::Verifier;
use k256::ecdsa::Signature;
use serde::{Deserialize, Serialize};

use super::keys::{PublicKey, SecretKey};

/// Hash-type marker appended to transaction-style signatures (`SIGHASH_ALL`)
pub const SIGHASH_ALL: u8 = 0x01;

/// Errors that can occur when decoding signature material
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature: {0}")]
    Malformed(String),
}

/// A detached signature and the key that produced it.
///
/// This is also the wire format of a sidecar signature file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureObject {
    pub signature: String,
    pub public_key: String,
}

/// Wrapper stored when content is both encrypted and signed.
///
/// `cipher_text` is the serialized `CipherObject` JSON and is what the
/// signature covers, so a reader can check integrity before decrypting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCipherObject {
    pub signature: String,
    pub public_key: String,
    pub cipher_text: String,
}

/// Sign `content` and return the DER signature with the signer's public key
pub fn sign_ecdsa(secret_key: &SecretKey, content: &[u8]) -> SignatureObject {
    let signature = secret_key.sign(content);
    SignatureObject {
        signature: hex::encode(signature.to_der().as_bytes()),
        public_key: secret_key.public().to_hex(),
    }
}

/// Check a hex DER signature over `content` against a hex public key.
///
/// Malformed keys or signatures verify as `false`; this never errors.
pub fn verify_ecdsa(content: &[u8], public_key: &str, signature: &str) -> bool {
    let Ok(public_key) = PublicKey::from_hex(public_key) else {
        return false;
    };
    let Ok(der) = hex::decode(signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(&der) else {
        return false;
    };
    // high-S signatures from other signers are still valid ECDSA
    let signature = signature.normalize_s().unwrap_or(signature);
    public_key
        .verifying_key()
        .verify(content, &signature)
        .is_ok()
}

/// DER signature followed by a one-byte hash-type marker, as used in
/// transaction scripts
pub fn encode_script_signature(signature: &Signature, hash_type: u8) -> Vec<u8> {
    let der = signature.to_der();
    let mut out = Vec::with_capacity(der.as_bytes().len() + 1);
    out.extend_from_slice(der.as_bytes());
    out.push(hash_type);
    out
}

/// Split a script signature into its DER body and hash-type marker
///
/// # Errors
///
/// Returns an error if the input is empty or the body is not valid DER.
pub fn strip_hash_type(encoded: &[u8]) -> Result<(&[u8], u8), SignatureError> {
    let Some((&hash_type, der)) = encoded.split_last() else {
        return Err(SignatureError::Malformed("empty script signature".into()));
    };
    Signature::from_der(der)
        .map_err(|_| SignatureError::Malformed("script signature body is not DER".into()))?;
    Ok((der, hash_type))
}
