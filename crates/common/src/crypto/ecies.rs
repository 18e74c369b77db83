//! ECIES over secp256k1
//!
//! To encrypt content for a recipient:
//! 1. **Generate ephemeral keypair**: a one-time secp256k1 key per call
//! 2. **Perform ECDH**: x-coordinate of `ephemeral_sk * recipient_pk`
//! 3. **Derive keys**: SHA-512 of the shared secret, split into a 32-byte
//!    AES-256-CBC key and a 32-byte HMAC-SHA256 key
//! 4. **Encrypt and MAC**: AES-256-CBC under a random 16-byte IV, then
//!    HMAC over `iv || ephemeral_pk || cipher_text`
//!
//! Decryption recomputes the MAC and compares it in constant time before
//! touching the cipher text. A mismatch is a hard failure.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::content::Content;

use super::keys::{KeyError, PublicKey, SecretKey};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Size of the AES-CBC initialization vector in bytes
pub const IV_SIZE: usize = 16;
/// Size of each derived symmetric key in bytes
pub const DERIVED_KEY_SIZE: usize = 32;

/// Errors that can occur during ECIES encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum EciesError {
    #[error("ecies error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    /// The cipher object is not structurally valid (bad hex, wrong sizes,
    /// bad padding once authenticated). Usually means the content was never
    /// encrypted in the first place.
    #[error("malformed cipher object: {0}")]
    Malformed(String),
    /// The MAC did not match: wrong key or tampered content
    #[error("decryption failed: failure in MAC check")]
    MacMismatch,
}

/// Encoding of the `cipherText` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherTextEncoding {
    #[default]
    Hex,
    Base64,
}

impl CipherTextEncoding {
    fn encode(&self, data: &[u8]) -> String {
        match self {
            CipherTextEncoding::Hex => hex::encode(data),
            CipherTextEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    fn decode(&self, data: &str) -> Result<Vec<u8>, EciesError> {
        match self {
            CipherTextEncoding::Hex => hex::decode(data)
                .map_err(|_| EciesError::Malformed("cipher text is not valid hex".into())),
            CipherTextEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|_| EciesError::Malformed("cipher text is not valid base64".into())),
        }
    }
}

/// Wire representation of ECIES-encrypted content
///
/// # Wire Format
///
/// ```text
/// {"iv": hex, "ephemeralPK": hex, "cipherText": hex|base64, "mac": hex,
///  "wasString": bool, "cipherTextEncoding"?: "hex"|"base64"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherObject {
    pub iv: String,
    #[serde(rename = "ephemeralPK")]
    pub ephemeral_pk: String,
    pub cipher_text: String,
    pub mac: String,
    pub was_string: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher_text_encoding: Option<CipherTextEncoding>,
}

impl CipherObject {
    pub fn encoding(&self) -> CipherTextEncoding {
        self.cipher_text_encoding.unwrap_or_default()
    }
}

/// Compare two byte strings without early exit on the first difference
pub fn equal_constant_time(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn shared_keys(shared_secret: &[u8; 32]) -> ([u8; DERIVED_KEY_SIZE], [u8; DERIVED_KEY_SIZE]) {
    let digest = Sha512::digest(shared_secret);
    let mut encryption_key = [0u8; DERIVED_KEY_SIZE];
    let mut mac_key = [0u8; DERIVED_KEY_SIZE];
    encryption_key.copy_from_slice(&digest[..DERIVED_KEY_SIZE]);
    mac_key.copy_from_slice(&digest[DERIVED_KEY_SIZE..]);
    (encryption_key, mac_key)
}

fn compute_mac(
    mac_key: &[u8],
    iv: &[u8],
    ephemeral_pk: &[u8],
    cipher_text: &[u8],
) -> Result<Vec<u8>, EciesError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|_| anyhow::anyhow!("invalid hmac key length"))?;
    mac.update(iv);
    mac.update(ephemeral_pk);
    mac.update(cipher_text);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Encrypt `content` so only the holder of `recipient`'s secret key can read it
///
/// A fresh ephemeral key and IV are drawn on every call.
///
/// # Errors
///
/// Returns an error only if the system RNG fails.
pub fn encrypt_ecies(
    recipient: &PublicKey,
    content: &Content,
    encoding: CipherTextEncoding,
) -> Result<CipherObject, EciesError> {
    let ephemeral = SecretKey::generate();
    let ephemeral_pk = ephemeral.public().to_bytes();
    let shared_secret = ephemeral.diffie_hellman(recipient);
    let (encryption_key, mac_key) = shared_keys(&shared_secret);

    let mut iv = [0u8; IV_SIZE];
    getrandom::getrandom(&mut iv).map_err(|e| anyhow::anyhow!("failed to generate iv: {}", e))?;

    let cipher_text = Aes256CbcEnc::new_from_slices(&encryption_key, &iv)
        .map_err(|_| anyhow::anyhow!("invalid aes key or iv length"))?
        .encrypt_padded_vec_mut::<Pkcs7>(content.as_bytes());

    let mac = compute_mac(&mac_key, &iv, &ephemeral_pk, &cipher_text)?;

    Ok(CipherObject {
        iv: hex::encode(iv),
        ephemeral_pk: hex::encode(ephemeral_pk),
        cipher_text: encoding.encode(&cipher_text),
        mac: hex::encode(mac),
        was_string: content.is_text(),
        cipher_text_encoding: match encoding {
            CipherTextEncoding::Hex => None,
            other => Some(other),
        },
    })
}

/// Decrypt a cipher object with the recipient's secret key
///
/// # Errors
///
/// Returns:
/// - `EciesError::Malformed` if fields are not decodable
/// - `EciesError::MacMismatch` if the MAC check fails (checked before any
///   decryption is attempted)
pub fn decrypt_ecies(
    secret_key: &SecretKey,
    cipher_object: &CipherObject,
) -> Result<Content, EciesError> {
    let iv = hex::decode(&cipher_object.iv)
        .map_err(|_| EciesError::Malformed("iv is not valid hex".into()))?;
    if iv.len() != IV_SIZE {
        return Err(EciesError::Malformed(format!(
            "iv must be {} bytes, got {}",
            IV_SIZE,
            iv.len()
        )));
    }
    let ephemeral_pk_bytes = hex::decode(&cipher_object.ephemeral_pk)
        .map_err(|_| EciesError::Malformed("ephemeral public key is not valid hex".into()))?;
    let ephemeral_pk = PublicKey::try_from(ephemeral_pk_bytes.as_slice())?;
    let cipher_text = cipher_object.encoding().decode(&cipher_object.cipher_text)?;
    let expected_mac = hex::decode(&cipher_object.mac)
        .map_err(|_| EciesError::Malformed("mac is not valid hex".into()))?;

    let shared_secret = secret_key.diffie_hellman(&ephemeral_pk);
    let (encryption_key, mac_key) = shared_keys(&shared_secret);

    let actual_mac = compute_mac(&mac_key, &iv, &ephemeral_pk_bytes, &cipher_text)?;
    if !equal_constant_time(&actual_mac, &expected_mac) {
        return Err(EciesError::MacMismatch);
    }

    let plain_text = Aes256CbcDec::new_from_slices(&encryption_key, &iv)
        .map_err(|_| anyhow::anyhow!("invalid aes key or iv length"))?
        .decrypt_padded_vec_mut::<Pkcs7>(&cipher_text)
        .map_err(|_| EciesError::Malformed("invalid padding".into()))?;

    if cipher_object.was_string {
        let text = String::from_utf8(plain_text)
            .map_err(|_| EciesError::Malformed("decrypted text is not utf-8".into()))?;
        Ok(Content::Text(text))
    } else {
        Ok(Content::Binary(plain_text.into()))
    }
}
