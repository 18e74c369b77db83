//! Address resolution for multi-reader signature checks
//!
//! Every user's app bucket URL embeds the Gaia address that owns it. To
//! check who signed a file, we look up where the file lives (the caller's own
//! hub connection, or another user's profile) and pull the address out of
//! that URL.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::crypto::is_valid_address;
use crate::hub::HubConfig;
use crate::transport::{build_request, HubTransport, TransportError};

/// Default endpoint for resolving a username to its profile
pub const DEFAULT_PROFILE_LOOKUP_URL: &str = "https://core.blockstack.org/v1/users/";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("profile lookup for {0} failed: {1}")]
    Lookup(String, String),
    #[error("profile for {username} has no storage bucket for app {app}")]
    MissingApp { username: String, app: String },
    #[error("no gaia address found in url: {0}")]
    NoAddress(String),
    #[error("either a username or a local hub config is required to resolve an address")]
    NoSource,
}

/// The part of an identity profile this crate cares about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// App origin -> storage bucket URL
    #[serde(default)]
    pub apps: BTreeMap<String, String>,
}

impl Profile {
    pub fn bucket_url(&self, app: &str) -> Option<&str> {
        self.apps.get(app).map(String::as_str)
    }
}

/// Resolves a username to its public profile.
///
/// The name system behind this (zone files, profile tokens) is out of this
/// crate's hands; implementations only need to produce the app map.
#[async_trait]
pub trait ProfileLookup: Send + Sync + std::fmt::Debug {
    async fn lookup_profile(&self, username: &str) -> Result<Profile, ResolveError>;
}

/// Looks profiles up over HTTP at `{lookup_url}{username}`.
///
/// Accepts both `{"<username>": {"profile": {...}}}` and `{"profile": {...}}`
/// response shapes.
#[derive(Debug, Clone)]
pub struct HttpProfileLookup<T> {
    transport: T,
    lookup_url: String,
}

impl<T: HubTransport> HttpProfileLookup<T> {
    pub fn new(transport: T, lookup_url: impl Into<String>) -> Self {
        Self {
            transport,
            lookup_url: lookup_url.into(),
        }
    }

    pub fn lookup_url(&self) -> &str {
        &self.lookup_url
    }
}

#[async_trait]
impl<T: HubTransport> ProfileLookup for HttpProfileLookup<T> {
    async fn lookup_profile(&self, username: &str) -> Result<Profile, ResolveError> {
        let url = format!("{}{}", self.lookup_url, username);
        tracing::debug!("lookup_profile: {}", url);
        let request = build_request(Method::GET, &url, &[], Bytes::new())?;
        let response = self.transport.send(request).await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ResolveError::Lookup(
                    username.to_string(),
                    "name not found".into(),
                ))
            }
            status => {
                return Err(ResolveError::Lookup(
                    username.to_string(),
                    format!("HTTP {}", status),
                ))
            }
        }

        let body: serde_json::Value = serde_json::from_slice(response.body())
            .map_err(|e| ResolveError::Lookup(username.to_string(), e.to_string()))?;
        let profile = body
            .get(username)
            .and_then(|entry| entry.get("profile"))
            .or_else(|| body.get("profile"))
            .cloned()
            .ok_or_else(|| {
                ResolveError::Lookup(username.to_string(), "response has no profile".into())
            })?;
        serde_json::from_value(profile)
            .map_err(|e| ResolveError::Lookup(username.to_string(), e.to_string()))
    }
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[13][a-km-zA-HJ-NP-Z0-9]{26,35}").expect("address pattern is valid")
    })
}

/// Pull the first checksummed address out of a bucket URL
pub fn extract_address(url: &str) -> Result<String, ResolveError> {
    address_pattern()
        .find_iter(url)
        .map(|found| found.as_str())
        .find(|candidate| is_valid_address(candidate))
        .map(str::to_string)
        .ok_or_else(|| ResolveError::NoAddress(url.to_string()))
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// Bucket URL under which `app`'s files are readable.
///
/// With a `username`, the URL registered in that user's profile; otherwise
/// the caller's own bucket on `local`. Always ends in `/`.
pub async fn resolve_bucket_url<L: ProfileLookup + ?Sized>(
    app: &str,
    username: Option<&str>,
    lookup: &L,
    local: Option<&HubConfig>,
) -> Result<String, ResolveError> {
    match (username, local) {
        (Some(username), _) => {
            let profile = lookup.lookup_profile(username).await?;
            let bucket_url = profile
                .bucket_url(app)
                .ok_or_else(|| ResolveError::MissingApp {
                    username: username.to_string(),
                    app: app.to_string(),
                })?;
            Ok(with_trailing_slash(bucket_url))
        }
        (None, Some(config)) => Ok(config.bucket_url()),
        (None, None) => Err(ResolveError::NoSource),
    }
}

/// Gaia address that owns `app`'s bucket for `username`, or for the caller
/// when no username is given
pub async fn resolve_address<L: ProfileLookup + ?Sized>(
    app: &str,
    username: Option<&str>,
    lookup: &L,
    local: Option<&HubConfig>,
) -> Result<String, ResolveError> {
    let bucket_url = resolve_bucket_url(app, username, lookup, local).await?;
    extract_address(&bucket_url)
}
