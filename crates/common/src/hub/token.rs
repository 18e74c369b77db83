//! Hub authorization tokens
//!
//! Two formats exist:
//!
//! - **Legacy**: `base64({"publickey", "signature"})`, where the signature is
//!   DER ECDSA over the raw challenge text with the transaction hash-type byte
//!   stripped off.
//! - **v1**: `v1:` followed by an ES256K-signed JWT whose payload carries the
//!   challenge, the hub URL, the issuer key, a random salt, and an optional
//!   association token.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use k256::ecdsa::signature::Verifier;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    encode_script_signature, strip_hash_type, KeyError, PublicKey, SecretKey, Signature,
    SignatureError, SIGHASH_ALL,
};

/// Prefix carried by versioned tokens
pub const V1_TOKEN_PREFIX: &str = "v1:";
/// JOSE algorithm name for secp256k1 ECDSA
pub const ES256K: &str = "ES256K";
/// First element of a legacy hub challenge
pub const LEGACY_CHALLENGE_TAG: &str = "gaiahub";
/// Last element of a legacy hub challenge
pub const LEGACY_CHALLENGE_PURPOSE: &str = "blockstack_storage_please_sign";
/// Number of bytes of randomness in a v1 token salt
pub const SALT_SIZE: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
    #[error("malformed token: {0}")]
    Malformed(String),
    /// The hub's challenge is not the legacy shape we know how to sign
    #[error("hub challenge is not a recognized legacy challenge: {0}")]
    UnrecognizedChallenge(String),
}

/// Payload of a v1 hub authorization token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenPayload {
    pub gaia_challenge: String,
    pub hub_url: String,
    /// Hex compressed public key of the signer
    pub iss: String,
    pub salt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_token: Option<String>,
}

/// Body of a legacy hub authorization token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAuthToken {
    pub publickey: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub typ: String,
    pub alg: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            typ: "JWT".to_string(),
            alg: ES256K.to_string(),
        }
    }
}

/// A JWT split into its decoded parts
#[derive(Debug, Clone)]
pub struct DecodedToken<P> {
    pub header: TokenHeader,
    pub payload: P,
    pub signing_input: String,
    pub signature: Vec<u8>,
}

/// Sign `payload` as a compact ES256K JWT
pub fn sign_jwt<P: Serialize>(payload: &P, key: &SecretKey) -> Result<String, TokenError> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&TokenHeader::default())?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
    let signing_input = format!("{}.{}", header, payload);
    let signature = key.sign(signing_input.as_bytes());
    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

/// Split and decode a compact JWT. A leading `v1:` prefix is ignored.
///
/// This does not check the signature; see `verify_v1_token`.
pub fn decode_jwt<P: for<'de> Deserialize<'de>>(
    token: &str,
) -> Result<DecodedToken<P>, TokenError> {
    let token = token.strip_prefix(V1_TOKEN_PREFIX).unwrap_or(token);
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed("expected three dot-separated parts".into()));
    };

    let decode = |part: &str, what: &str| {
        URL_SAFE_NO_PAD
            .decode(part)
            .map_err(|_| TokenError::Malformed(format!("{} is not base64url", what)))
    };

    Ok(DecodedToken {
        header: serde_json::from_slice(&decode(header, "header")?)?,
        payload: serde_json::from_slice(&decode(payload, "payload")?)?,
        signing_input: format!("{}.{}", header, payload),
        signature: decode(signature, "signature")?,
    })
}

/// Build a `v1:` token answering `challenge_text` for `hub_url`
pub fn make_v1_token(
    challenge_text: &str,
    hub_url: &str,
    key: &SecretKey,
    association_token: Option<&str>,
) -> Result<String, TokenError> {
    let mut salt = [0u8; SALT_SIZE];
    getrandom::getrandom(&mut salt)
        .map_err(|e| anyhow::anyhow!("failed to generate salt: {}", e))?;

    let payload = AuthTokenPayload {
        gaia_challenge: challenge_text.to_string(),
        hub_url: hub_url.to_string(),
        iss: key.public().to_hex(),
        salt: hex::encode(salt),
        association_token: association_token.map(str::to_string),
    };
    Ok(format!("{}{}", V1_TOKEN_PREFIX, sign_jwt(&payload, key)?))
}

/// Decode a `v1:` token and check its signature against the `iss` key
pub fn verify_v1_token(token: &str) -> Result<AuthTokenPayload, TokenError> {
    if !token.starts_with(V1_TOKEN_PREFIX) {
        return Err(TokenError::Malformed("missing v1: prefix".into()));
    }
    let decoded: DecodedToken<AuthTokenPayload> = decode_jwt(token)?;
    if decoded.header.alg != ES256K {
        return Err(TokenError::Malformed(format!(
            "unsupported algorithm {}",
            decoded.header.alg
        )));
    }
    let issuer = PublicKey::from_hex(&decoded.payload.iss)?;
    let signature = Signature::from_slice(&decoded.signature)
        .map_err(|_| TokenError::Malformed("signature is not 64 bytes r||s".into()))?;
    issuer
        .verifying_key()
        .verify(decoded.signing_input.as_bytes(), &signature)
        .map_err(|_| TokenError::Malformed("signature does not match issuer".into()))?;
    Ok(decoded.payload)
}

/// Check that `challenge_text` is the legacy four-element challenge
/// `["gaiahub", <version>, <server name>, "blockstack_storage_please_sign"]`.
///
/// Variants are rejected rather than guessed at.
pub fn parse_legacy_challenge(challenge_text: &str) -> Result<Vec<serde_json::Value>, TokenError> {
    let parsed: Vec<serde_json::Value> = serde_json::from_str(challenge_text)
        .map_err(|_| TokenError::UnrecognizedChallenge(challenge_text.to_string()))?;
    let recognized = parsed.len() == 4
        && parsed[0].as_str() == Some(LEGACY_CHALLENGE_TAG)
        && parsed[3].as_str() == Some(LEGACY_CHALLENGE_PURPOSE);
    if !recognized {
        return Err(TokenError::UnrecognizedChallenge(challenge_text.to_string()));
    }
    Ok(parsed)
}

/// Build a legacy token answering `challenge_text`
pub fn make_legacy_token(challenge_text: &str, key: &SecretKey) -> Result<String, TokenError> {
    parse_legacy_challenge(challenge_text)?;

    let signature = key.sign(challenge_text.as_bytes());
    let script_signature = encode_script_signature(&signature, SIGHASH_ALL);
    let (der, _) = strip_hash_type(&script_signature)?;

    let token = LegacyAuthToken {
        publickey: key.public().to_hex(),
        signature: hex::encode(der),
    };
    Ok(STANDARD.encode(serde_json::to_vec(&token)?))
}

/// Decode a legacy token's JSON body
pub fn decode_legacy_token(token: &str) -> Result<LegacyAuthToken, TokenError> {
    let json = STANDARD
        .decode(token)
        .map_err(|_| TokenError::Malformed("legacy token is not base64".into()))?;
    Ok(serde_json::from_slice(&json)?)
}
