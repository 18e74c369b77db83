//! Shared test utilities: an in-memory Gaia hub and a static profile lookup
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use parking_lot::Mutex;

use common::crypto::{address_from_public_key_hex, verify_ecdsa, SecretKey};
use common::hub::token::{decode_legacy_token, verify_v1_token};
use common::hub::V1_TOKEN_PREFIX;
use common::resolver::{Profile, ProfileLookup, ResolveError};
use common::session::Session;
use common::storage::Storage;
use common::transport::{HubTransport, TransportError};

pub const HUB_URL: &str = "https://hub.test";
pub const READ_URL_PREFIX: &str = "https://gaia.test/hub/";
pub const APP_DOMAIN: &str = "https://app.test";

pub type TestStorage = Storage<Session, MemoryHub, StaticProfiles>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthScheme {
    Legacy,
    #[default]
    V1,
}

#[derive(Debug, Clone)]
struct StoredFile {
    content_type: String,
    body: Bytes,
}

#[derive(Debug, Default)]
struct HubState {
    /// `{address}/{path}` -> file
    files: BTreeMap<String, StoredFile>,
    /// Bumped to invalidate every token issued so far
    epoch: u64,
    forced_failures: Vec<StatusCode>,
    hub_info_requests: usize,
    store_requests: usize,
    delete_requests: usize,
    list_requests: usize,
    tokens_seen: Vec<String>,
}

/// A Gaia hub that lives in memory and checks tokens the way a real one does.
///
/// Writes, deletes and listings must carry a token answering the hub's
/// current challenge, signed by the key that owns the address in the URL.
/// `revoke_tokens` rotates the challenge so every outstanding token goes
/// stale.
#[derive(Debug)]
pub struct MemoryHub {
    scheme: AuthScheme,
    page_size: usize,
    max_upload_megabytes: Option<f64>,
    endless_pages: bool,
    scripted_pages: Option<Vec<serde_json::Value>>,
    state: Mutex<HubState>,
}

impl MemoryHub {
    pub fn new(scheme: AuthScheme) -> Self {
        Self {
            scheme,
            page_size: 100,
            max_upload_megabytes: None,
            endless_pages: false,
            scripted_pages: None,
            state: Mutex::new(HubState::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_upload_megabytes(mut self, megabytes: f64) -> Self {
        self.max_upload_megabytes = Some(megabytes);
        self
    }

    /// Always hand back a continuation token, like a broken hub
    pub fn with_endless_pages(mut self) -> Self {
        self.endless_pages = true;
        self
    }

    /// Answer listings with these raw bodies; the continuation token of
    /// each page is the index of the next one
    pub fn with_scripted_pages(mut self, pages: Vec<serde_json::Value>) -> Self {
        self.scripted_pages = Some(pages);
        self
    }

    pub fn challenge_text(&self) -> String {
        let epoch = self.state.lock().epoch;
        match self.scheme {
            AuthScheme::Legacy => format!(
                r#"["gaiahub","0","hub.test-{}","blockstack_storage_please_sign"]"#,
                epoch
            ),
            AuthScheme::V1 => format!("hub.test-challenge-{}", epoch),
        }
    }

    pub fn revoke_tokens(&self) {
        self.state.lock().epoch += 1;
    }

    /// Answer the next authorized requests with these statuses, in order
    pub fn fail_next(&self, statuses: &[StatusCode]) {
        self.state.lock().forced_failures.extend_from_slice(statuses);
    }

    pub fn hub_info_requests(&self) -> usize {
        self.state.lock().hub_info_requests
    }

    pub fn store_requests(&self) -> usize {
        self.state.lock().store_requests
    }

    pub fn delete_requests(&self) -> usize {
        self.state.lock().delete_requests
    }

    pub fn list_requests(&self) -> usize {
        self.state.lock().list_requests
    }

    /// Every bearer token presented on an authorized endpoint
    pub fn tokens_seen(&self) -> Vec<String> {
        self.state.lock().tokens_seen.clone()
    }

    pub fn stored(&self, address: &str, path: &str) -> Option<Bytes> {
        self.state
            .lock()
            .files
            .get(&format!("{}/{}", address, path))
            .map(|file| file.body.clone())
    }

    pub fn stored_content_type(&self, address: &str, path: &str) -> Option<String> {
        self.state
            .lock()
            .files
            .get(&format!("{}/{}", address, path))
            .map(|file| file.content_type.clone())
    }

    /// Write directly into a bucket, bypassing authorization
    pub fn put_raw(&self, address: &str, path: &str, content_type: &str, body: impl Into<Bytes>) {
        self.state.lock().files.insert(
            format!("{}/{}", address, path),
            StoredFile {
                content_type: content_type.to_string(),
                body: body.into(),
            },
        );
    }

    pub fn bucket_url(address: &str) -> String {
        format!("{}{}/", READ_URL_PREFIX, address)
    }

    fn hub_info(&self) -> Response<Bytes> {
        self.state.lock().hub_info_requests += 1;
        let mut info = serde_json::json!({
            "read_url_prefix": READ_URL_PREFIX,
            "challenge_text": self.challenge_text(),
        });
        if self.scheme == AuthScheme::V1 {
            info["latest_auth_version"] = "v1".into();
        }
        if let Some(megabytes) = self.max_upload_megabytes {
            info["max_file_upload_size_megabytes"] = megabytes.into();
        }
        json(StatusCode::OK, &info)
    }

    /// Check the bearer token authorizes writes to `address`
    fn authorize(&self, request: &Request<Bytes>, address: &str) -> Result<(), Response<Bytes>> {
        let token = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("bearer "))
            .ok_or_else(|| text(StatusCode::UNAUTHORIZED, "missing bearer token"))?
            .to_string();

        let forced = {
            let mut state = self.state.lock();
            state.tokens_seen.push(token.clone());
            if state.forced_failures.is_empty() {
                None
            } else {
                Some(state.forced_failures.remove(0))
            }
        };
        if let Some(status) = forced {
            return Err(text(status, "forced failure"));
        }

        let challenge = self.challenge_text();
        let signer = if token.starts_with(V1_TOKEN_PREFIX) {
            let payload = verify_v1_token(&token)
                .map_err(|e| text(StatusCode::UNAUTHORIZED, &e.to_string()))?;
            if payload.gaia_challenge != challenge || payload.hub_url != HUB_URL {
                return Err(text(StatusCode::UNAUTHORIZED, "stale token"));
            }
            payload.iss
        } else {
            let legacy = decode_legacy_token(&token)
                .map_err(|e| text(StatusCode::UNAUTHORIZED, &e.to_string()))?;
            if !verify_ecdsa(challenge.as_bytes(), &legacy.publickey, &legacy.signature) {
                return Err(text(StatusCode::UNAUTHORIZED, "stale token"));
            }
            legacy.publickey
        };

        if address_from_public_key_hex(&signer).as_deref() != Some(address) {
            return Err(text(StatusCode::FORBIDDEN, "token is for another address"));
        }
        Ok(())
    }

    fn store(&self, request: &Request<Bytes>, address: &str, path: &str) -> Response<Bytes> {
        self.state.lock().store_requests += 1;
        if let Err(response) = self.authorize(request, address) {
            return response;
        }
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        self.put_raw(address, path, &content_type, request.body().clone());
        json(
            StatusCode::ACCEPTED,
            &serde_json::json!({ "publicURL": format!("{}{}", Self::bucket_url(address), path) }),
        )
    }

    fn delete(&self, request: &Request<Bytes>, address: &str, path: &str) -> Response<Bytes> {
        self.state.lock().delete_requests += 1;
        if let Err(response) = self.authorize(request, address) {
            return response;
        }
        match self
            .state
            .lock()
            .files
            .remove(&format!("{}/{}", address, path))
        {
            Some(_) => Response::builder()
                .status(StatusCode::ACCEPTED)
                .body(Bytes::new())
                .unwrap(),
            None => text(StatusCode::NOT_FOUND, "no such file"),
        }
    }

    fn list_files(&self, request: &Request<Bytes>, address: &str) -> Response<Bytes> {
        self.state.lock().list_requests += 1;
        if let Err(response) = self.authorize(request, address) {
            return response;
        }
        let body: serde_json::Value = serde_json::from_slice(request.body()).unwrap_or_default();
        let start: usize = body
            .get("page")
            .and_then(|page| page.as_str())
            .and_then(|page| page.parse().ok())
            .unwrap_or(0);

        let prefix = format!("{}/", address);
        let names: Vec<String> = self
            .state
            .lock()
            .files
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect();

        if self.endless_pages {
            let entry = format!("phantom-{}", start);
            return json(
                StatusCode::OK,
                &serde_json::json!({ "entries": [entry], "page": (start + 1).to_string() }),
            );
        }

        if let Some(pages) = &self.scripted_pages {
            let page = pages
                .get(start)
                .cloned()
                .unwrap_or_else(|| serde_json::json!({ "entries": [], "page": null }));
            return json(StatusCode::OK, &page);
        }

        let end = (start + self.page_size).min(names.len());
        let entries = names.get(start..end).unwrap_or_default();
        let page = (end < names.len()).then(|| end.to_string());
        json(
            StatusCode::OK,
            &serde_json::json!({ "entries": entries, "page": page }),
        )
    }

    fn read(&self, address: &str, path: &str) -> Response<Bytes> {
        let file = self
            .state
            .lock()
            .files
            .get(&format!("{}/{}", address, path))
            .cloned();
        match file {
            Some(file) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, file.content_type)
                .body(file.body)
                .unwrap(),
            None => text(StatusCode::NOT_FOUND, "not found"),
        }
    }
}

#[async_trait]
impl HubTransport for MemoryHub {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let uri = request.uri().to_string();
        let method = request.method().clone();

        if let Some(rest) = uri.strip_prefix(READ_URL_PREFIX) {
            let (address, path) = rest.split_once('/').unwrap_or((rest, ""));
            return Ok(match method {
                Method::GET => self.read(address, path),
                _ => text(StatusCode::METHOD_NOT_ALLOWED, "read only"),
            });
        }

        let Some(rest) = uri.strip_prefix(HUB_URL) else {
            return Err(TransportError::InvalidRequest(format!("unknown host: {}", uri)));
        };
        let rest = rest.trim_start_matches('/');
        let (endpoint, rest) = rest.split_once('/').unwrap_or((rest, ""));
        let (address, path) = rest.split_once('/').unwrap_or((rest, ""));

        Ok(match (method, endpoint) {
            (Method::GET, "hub_info") => self.hub_info(),
            (Method::POST, "store") => self.store(&request, address, path),
            (Method::DELETE, "delete") => self.delete(&request, address, path),
            (Method::POST, "list-files") => self.list_files(&request, address),
            _ => text(StatusCode::NOT_FOUND, "no such endpoint"),
        })
    }
}

fn json(status: StatusCode, value: &serde_json::Value) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from(serde_json::to_vec(value).unwrap()))
        .unwrap()
}

fn text(status: StatusCode, body: &str) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain")
        .body(Bytes::from(body.to_string()))
        .unwrap()
}

/// Profiles keyed by username
#[derive(Debug, Default)]
pub struct StaticProfiles {
    profiles: Mutex<BTreeMap<String, Profile>>,
}

impl StaticProfiles {
    /// Register `username`'s bucket for `app`
    pub fn register(&self, username: &str, app: &str, bucket_url: &str) {
        self.profiles
            .lock()
            .entry(username.to_string())
            .or_default()
            .apps
            .insert(app.to_string(), bucket_url.to_string());
    }
}

#[async_trait]
impl ProfileLookup for StaticProfiles {
    async fn lookup_profile(&self, username: &str) -> Result<Profile, ResolveError> {
        self.profiles
            .lock()
            .get(username)
            .cloned()
            .ok_or_else(|| ResolveError::Lookup(username.to_string(), "name not found".into()))
    }
}

/// A user signed in to the shared hub
pub struct TestUser {
    pub key: SecretKey,
    pub address: String,
    pub storage: TestStorage,
}

/// Sign a fresh user in to `hub`. No connection is negotiated until the
/// first operation needs one.
pub fn user(hub: &Arc<MemoryHub>, profiles: &Arc<StaticProfiles>) -> TestUser {
    let key = SecretKey::generate();
    let address = key.public().to_address();
    let session = Session::new(key.clone(), HUB_URL, APP_DOMAIN);
    let storage = Storage::new(Arc::new(session), hub.clone(), profiles.clone());
    TestUser {
        key,
        address,
        storage,
    }
}

/// A v1 hub with one user
pub fn setup() -> (Arc<MemoryHub>, Arc<StaticProfiles>, TestUser) {
    setup_with(MemoryHub::new(AuthScheme::V1))
}

pub fn setup_with(hub: MemoryHub) -> (Arc<MemoryHub>, Arc<StaticProfiles>, TestUser) {
    let hub = Arc::new(hub);
    let profiles = Arc::new(StaticProfiles::default());
    let alice = user(&hub, &profiles);
    (hub, profiles, alice)
}
