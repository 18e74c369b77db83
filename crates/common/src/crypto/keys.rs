use std::fmt;

use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::address::address_from_public_key_bytes;

/// Size of a secp256k1 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of a compressed SEC1 public key in bytes
pub const COMPRESSED_PUBLIC_KEY_SIZE: usize = 33;
/// Size of an uncompressed SEC1 public key in bytes
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Public half of a secp256k1 keypair
///
/// Used as the recipient of ECIES encryption, to check ECDSA signatures, and
/// to derive the Gaia storage address that namespaces a user's files on a hub.
/// Serializes as compressed SEC1 hex.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate();
/// let public_key = secret_key.public();
///
/// let hex = public_key.to_hex();
/// let recovered = PublicKey::from_hex(&hex)?;
/// assert_eq!(public_key.to_address(), recovered.to_address());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

impl From<k256::PublicKey> for PublicKey {
    fn from(key: k256::PublicKey) -> Self {
        PublicKey(key)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != COMPRESSED_PUBLIC_KEY_SIZE && bytes.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid public key size, expected {} or {}, got {}",
                COMPRESSED_PUBLIC_KEY_SIZE,
                UNCOMPRESSED_PUBLIC_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let key = k256::PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| anyhow::anyhow!("public key is not a valid secp256k1 point"))?;
        Ok(PublicKey(key))
    }
}

impl PublicKey {
    /// Parse a public key from SEC1 hex, compressed or uncompressed
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes =
            hex::decode(hex).map_err(|_| anyhow::anyhow!("public key hex decode error"))?;
        Self::try_from(bytes.as_slice())
    }

    /// Compressed SEC1 encoding
    pub fn to_bytes(&self) -> [u8; COMPRESSED_PUBLIC_KEY_SIZE] {
        let point = self.0.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_PUBLIC_KEY_SIZE];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Compressed SEC1 encoding as hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Gaia storage address for this key (base58check over hash160 of the
    /// compressed encoding)
    pub fn to_address(&self) -> String {
        address_from_public_key_bytes(&self.to_bytes())
    }

    pub(crate) fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&self.0)
    }

    pub(crate) fn inner(&self) -> &k256::PublicKey {
        &self.0
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        PublicKey::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Private half of a secp256k1 keypair
///
/// This is the app private key handed to the client by the identity layer. It
/// owns the hub namespace, signs hub authorization tokens and file signatures,
/// and decrypts content encrypted to its public key.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate();
///
/// let pem = secret_key.to_pem();
/// std::fs::write("key.pem", pem)?;
///
/// let pem = std::fs::read_to_string("key.pem")?;
/// let recovered = SecretKey::from_pem(&pem)?;
/// ```
#[derive(Clone)]
pub struct SecretKey(k256::SecretKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey")
            .field(&self.public().to_hex())
            .finish()
    }
}

impl TryFrom<&[u8]> for SecretKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid private key size, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let key = k256::SecretKey::from_slice(bytes)
            .map_err(|_| anyhow::anyhow!("private key is out of range for secp256k1"))?;
        Ok(SecretKey(key))
    }
}

impl SecretKey {
    /// Parse a secret key from a hexadecimal string
    ///
    /// Accepts plain hex, "0x"-prefixed hex, and the 33-byte form with a
    /// trailing `01` compression marker used by wallet exports.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let hex = match hex.len() {
            66 if hex.ends_with("01") => &hex[..64],
            _ => hex,
        };
        let bytes =
            hex::decode(hex).map_err(|_| anyhow::anyhow!("private key hex decode error"))?;
        Self::try_from(bytes.as_slice())
    }

    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; PRIVATE_KEY_SIZE];
            getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
            // out-of-range scalars are astronomically rare, just draw again
            if let Ok(key) = k256::SecretKey::from_slice(&bytes) {
                return SecretKey(key);
            }
        }
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    /// Convert secret key to raw bytes
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes().into()
    }

    /// Convert secret key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Encode secret key in PEM format for storage
    ///
    /// Returns a PEM-encoded string with tag "PRIVATE KEY".
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new("PRIVATE KEY", self.to_bytes());
        pem::encode(&pem)
    }

    /// Parse a secret key from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not "PRIVATE KEY"
    /// - The key size is incorrect or the scalar is out of range
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;

        if pem.tag() != "PRIVATE KEY" {
            return Err(anyhow::anyhow!("invalid PEM tag, expected PRIVATE KEY").into());
        }

        Self::try_from(pem.contents())
    }

    /// Sign a message with ECDSA over its SHA-256 digest.
    ///
    /// Signatures are always low-S normalized.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        let signing_key = SigningKey::from(&self.0);
        signing_key.sign(msg)
    }

    /// ECDH with `other`, returning the x-coordinate of the shared point
    pub(crate) fn diffie_hellman(&self, other: &PublicKey) -> [u8; 32] {
        let shared =
            k256::ecdh::diffie_hellman(self.0.to_nonzero_scalar(), other.inner().as_affine());
        let mut out = [0u8; 32];
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        out
    }
}
