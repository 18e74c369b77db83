//! Hub connection negotiation
//!
//! A hub advertises its capabilities at `GET {hub}/hub_info`. From that we
//! build a `HubConfig`: the address our files live under, where they can be
//! read publicly, and a bearer token the hub accepts for writes.

pub mod token;

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::crypto::SecretKey;
use crate::transport::{build_request, HubTransport, TransportError};

pub use token::{AuthTokenPayload, LegacyAuthToken, TokenError, V1_TOKEN_PREFIX};

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("hub_info request to {0} failed with HTTP {1}: {2}")]
    Status(String, StatusCode, String),
    #[error("invalid hub_info response: {0}")]
    InvalidHubInfo(#[from] serde_json::Error),
    /// The hub speaks neither the v1 nor the legacy authorization scheme
    #[error("hub at {0} is not compatible with this client; if you operate this hub, please update it")]
    ProtocolIncompatible(String),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

/// Capabilities reported by `GET {hub}/hub_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubInfo {
    pub read_url_prefix: String,
    pub challenge_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_auth_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_upload_size_megabytes: Option<f64>,
}

impl HubInfo {
    /// Numeric auth version (`"v1"` -> 1). Absent or unparseable markers
    /// mean a legacy hub (0).
    pub fn auth_version(&self) -> u32 {
        self.latest_auth_version
            .as_deref()
            .and_then(|version| version.strip_prefix('v'))
            .and_then(|number| number.parse().ok())
            .unwrap_or(0)
    }
}

/// A negotiated connection to a hub.
///
/// Treated as an immutable value: when the hub rejects a token, a fresh
/// config is negotiated and swapped in rather than this one being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    pub address: String,
    pub url_prefix: String,
    pub token: String,
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_upload_size_megabytes: Option<f64>,
}

impl HubConfig {
    /// `{url_prefix}{address}/`: base URL under which this user's files are
    /// publicly readable
    pub fn bucket_url(&self) -> String {
        format!("{}{}/", self.url_prefix, self.address)
    }

    /// Public read URL for `path`
    pub fn read_url(&self, path: &str) -> String {
        format!("{}{}", self.bucket_url(), path)
    }

    /// Hub endpoint `{server}/{endpoint}/{address}[/{path}]`
    pub fn endpoint_url(&self, endpoint: &str, path: Option<&str>) -> String {
        let server = self.server.trim_end_matches('/');
        match path {
            Some(path) => format!("{}/{}/{}/{}", server, endpoint, self.address, path),
            None => format!("{}/{}/{}", server, endpoint, self.address),
        }
    }

    /// Upload limit in bytes, when the hub advertises one
    pub fn max_upload_bytes(&self) -> Option<u64> {
        self.max_file_upload_size_megabytes
            .filter(|megabytes| *megabytes > 0.0)
            .map(|megabytes| (megabytes * 1024.0 * 1024.0) as u64)
    }

    /// `Authorization` header value for hub calls
    pub fn authorization(&self) -> String {
        format!("bearer {}", self.token)
    }
}

/// Fetch `{hub_url}/hub_info`
pub async fn get_hub_info<T: HubTransport + ?Sized>(
    transport: &T,
    hub_url: &str,
) -> Result<HubInfo, HubError> {
    let url = format!("{}/hub_info", hub_url.trim_end_matches('/'));
    let request = build_request(Method::GET, &url, &[], Bytes::new())?;
    let response = transport.send(request).await?;
    if !response.status().is_success() {
        return Err(HubError::Status(
            url,
            response.status(),
            String::from_utf8_lossy(response.body()).to_string(),
        ));
    }
    Ok(serde_json::from_slice(response.body())?)
}

/// Negotiate a connection to the hub at `hub_url` as `signing_key`.
///
/// Performs one round-trip. Safe to call repeatedly; each call yields a fresh
/// token.
///
/// # Arguments
/// * `transport` - Issues the `hub_info` request
/// * `hub_url` - Base URL of the hub, embedded verbatim in v1 tokens
/// * `signing_key` - Key that owns the namespace and signs the token
/// * `association_token` - Passed through opaquely in v1 tokens
pub async fn connect_to_gaia_hub<T: HubTransport + ?Sized>(
    transport: &T,
    hub_url: &str,
    signing_key: &SecretKey,
    association_token: Option<&str>,
) -> Result<HubConfig, HubError> {
    tracing::debug!("connect_to_gaia_hub: fetching hub_info from {}", hub_url);
    let hub_info = get_hub_info(transport, hub_url).await?;
    let auth_version = hub_info.auth_version();

    let token = if auth_version >= 1 {
        token::make_v1_token(
            &hub_info.challenge_text,
            hub_url,
            signing_key,
            association_token,
        )?
    } else {
        tracing::debug!("connect_to_gaia_hub: {} is a legacy hub", hub_url);
        match token::make_legacy_token(&hub_info.challenge_text, signing_key) {
            Ok(token) => token,
            Err(TokenError::UnrecognizedChallenge(challenge)) => {
                tracing::error!(
                    "connect_to_gaia_hub: unrecognized legacy challenge from {}: {}",
                    hub_url,
                    challenge
                );
                return Err(HubError::ProtocolIncompatible(hub_url.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    };

    let config = HubConfig {
        address: signing_key.public().to_address(),
        url_prefix: hub_info.read_url_prefix,
        token,
        server: hub_url.to_string(),
        max_file_upload_size_megabytes: hub_info.max_file_upload_size_megabytes,
    };
    tracing::info!(
        "connected to hub {} as {} (auth version {})",
        config.server,
        config.address,
        auth_version
    );
    Ok(config)
}

/// Negotiate with the hub and return the public bucket URL for `key`
pub async fn get_bucket_url<T: HubTransport + ?Sized>(
    transport: &T,
    hub_url: &str,
    key: &SecretKey,
) -> Result<String, HubError> {
    let config = connect_to_gaia_hub(transport, hub_url, key, None).await?;
    Ok(config.bucket_url())
}
