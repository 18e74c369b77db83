//! File storage on a Gaia hub
//!
//! `Storage` layers optional encryption and signing around file content and
//! moves it to and from the user's hub:
//!
//! - **Writes** (`put_file`) compose one or two uploads depending on the
//!   `WriteMode`, then POST them to `{server}/store/{address}/{path}`
//! - **Reads** (`get_file`) fetch from the public read URL of our own bucket,
//!   or of another user's bucket resolved through their profile, then verify
//!   and/or decrypt according to the `ReadMode`
//! - **Deletes** and **listings** go through the hub's authorized endpoints
//!
//! # Stale credentials
//!
//! Writes, deletes, and the first page of a listing are retried exactly once
//! after renegotiating the hub connection when the hub rejects the token (or
//! fails in a way a fresh connection might fix). See [`with_reconnect`].
//!
//! # Signer binding
//!
//! A signature is only accepted when the signer's address is the address that
//! owns the bucket being read. A valid signature from any other key is a
//! verification failure.

mod error;
mod options;
mod retry;

use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::content::{is_textual_content_type, Content, JSON_CONTENT_TYPE};
use crate::crypto::{
    address_from_public_key_hex, decrypt_ecies, encrypt_ecies, sign_ecdsa, verify_ecdsa,
    CipherObject, EciesError, PublicKey, SecretKey, SignatureObject, SignedCipherObject,
};
use crate::hub::{connect_to_gaia_hub, HubConfig};
use crate::resolver::{resolve_address, resolve_bucket_url, HttpProfileLookup, ProfileLookup};
use crate::session::SessionStore;
use crate::transport::{build_request, HubTransport, ReqwestTransport};

pub use error::StorageError;
pub use options::{
    DeleteOptions, GetOptions, PutOptions, ReadMode, StorageConfig, WriteMode,
    DEFAULT_MAX_LIST_PAGES, SIGNATURE_FILE_SUFFIX,
};
pub use retry::with_reconnect;

/// `Storage` over reqwest, with profiles looked up over the same client
pub type HttpStorage<S> = Storage<S, ReqwestTransport, HttpProfileLookup<Arc<ReqwestTransport>>>;

/// A single object to POST to the hub
#[derive(Debug, Clone)]
struct Upload {
    path: String,
    body: Bytes,
    content_type: String,
}

impl Upload {
    fn new(
        path: impl Into<String>,
        body: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
            content_type: content_type.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StoreResponse {
    #[serde(rename = "publicURL")]
    public_url: String,
}

#[derive(Debug, Serialize)]
struct ListFilesRequest<'a> {
    page: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ListFilesResponse {
    /// `None` when the hub omitted the field; individual `None`s are
    /// entries the hub filtered out
    entries: Option<Vec<Option<String>>>,
    #[serde(default)]
    page: Option<String>,
}

/// File operations against the hub of the user behind a `SessionStore`
#[derive(Debug)]
pub struct Storage<S, T, L> {
    session: Arc<S>,
    transport: Arc<T>,
    lookup: Arc<L>,
    config: StorageConfig,
}

impl<S> HttpStorage<S>
where
    S: SessionStore,
{
    /// Storage that talks to hubs and the profile lookup service over HTTP
    pub fn over_http(session: Arc<S>, config: StorageConfig) -> Result<Self, StorageError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        let lookup = Arc::new(HttpProfileLookup::new(
            transport.clone(),
            config.profile_lookup_url.clone(),
        ));
        Ok(Self::new(session, transport, lookup).with_config(config))
    }
}

impl<S, T, L> Storage<S, T, L>
where
    S: SessionStore,
    T: HubTransport,
    L: ProfileLookup,
{
    pub fn new(session: Arc<S>, transport: Arc<T>, lookup: Arc<L>) -> Self {
        Self {
            session,
            transport,
            lookup,
            config: StorageConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// The session's hub connection, negotiating one if there is none yet
    pub async fn hub_config(&self) -> Result<HubConfig, StorageError> {
        match self.session.hub_config() {
            Some(config) => Ok(config),
            None => self.reconnect().await,
        }
    }

    /// Negotiate a fresh hub connection and hand it to the session
    pub async fn reconnect(&self) -> Result<HubConfig, StorageError> {
        let config = connect_to_gaia_hub(
            self.transport.as_ref(),
            self.session.hub_url(),
            self.session.app_private_key(),
            self.session.association_token(),
        )
        .await?;
        self.session.set_hub_config(config.clone());
        Ok(config)
    }

    /// Store `content` at `path` and return its public read URL.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `StorageError::PayloadTooLarge` if any composed upload exceeds the
    ///   hub's advertised limit; nothing is uploaded in that case
    /// - `StorageError::PreconditionFailed` on HTTP 412
    /// - `StorageError::Unauthorized` if the hub still rejects us after one
    ///   reconnect
    pub async fn put_file(
        &self,
        path: &str,
        content: impl Into<Content>,
        options: &PutOptions,
    ) -> Result<String, StorageError> {
        check_path(path)?;
        let uploads = self.compose_uploads(path, content.into(), options)?;

        let config = self.hub_config().await?;
        if let Some(limit) = config.max_upload_bytes() {
            if let Some(upload) = uploads
                .iter()
                .find(|upload| upload.body.len() as u64 > limit)
            {
                return Err(StorageError::PayloadTooLarge {
                    path: upload.path.clone(),
                    size: upload.body.len(),
                    limit,
                });
            }
        }

        let uploads = &uploads;
        let public_url = with_reconnect(
            "put_file",
            config,
            move |config| async move { self.upload_all(&config, uploads).await },
            move || self.reconnect(),
        )
        .await?;
        tracing::info!("put_file: stored {} at {}", path, public_url);
        Ok(public_url)
    }

    /// Read `path`, returning `None` if the hub has no such file.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `StorageError::SignatureVerification` if a required signature is
    ///   missing, invalid, or made by someone other than the bucket owner
    /// - `StorageError::Decryption` if the MAC check fails
    /// - `StorageError::NotEncrypted` if the content is not a cipher object
    pub async fn get_file(
        &self,
        path: &str,
        options: &GetOptions,
    ) -> Result<Option<Content>, StorageError> {
        check_path(path)?;
        let bucket_url = self.bucket_url_for(options).await?;
        let url = format!("{}{}", bucket_url, path);

        match &options.mode {
            ReadMode::Plain => self.fetch(&url, path).await,
            ReadMode::Verify => self.get_verified(&bucket_url, path, options).await,
            ReadMode::Decrypt { key } => {
                let Some(content) = self.fetch(&url, path).await? else {
                    return Ok(None);
                };
                self.decrypt_content(path, content.as_bytes(), key.as_ref())
                    .map(Some)
            }
            ReadMode::DecryptVerify { key } => {
                let Some(content) = self.fetch(&url, path).await? else {
                    return Ok(None);
                };
                let wrapper: SignedCipherObject = serde_json::from_slice(content.as_bytes())
                    .map_err(|e| StorageError::NotEncrypted {
                        path: path.to_string(),
                        reason: format!("not a signed cipher object: {}", e),
                    })?;
                if wrapper.signature.is_empty()
                    || wrapper.public_key.is_empty()
                    || wrapper.cipher_text.is_empty()
                {
                    return Err(StorageError::signature(
                        path,
                        "signed cipher object is missing its signature, public key, or cipher text",
                    ));
                }
                let expected = self.expected_signer(options).await?;
                check_signer(path, &expected, &wrapper.public_key)?;
                if !verify_ecdsa(
                    wrapper.cipher_text.as_bytes(),
                    &wrapper.public_key,
                    &wrapper.signature,
                ) {
                    return Err(StorageError::signature(
                        path,
                        "cipher text does not match its signature",
                    ));
                }
                self.decrypt_content(path, wrapper.cipher_text.as_bytes(), key.as_ref())
                    .map(Some)
            }
        }
    }

    /// Public read URL of `path`, without fetching it
    pub async fn get_file_url(
        &self,
        path: &str,
        options: &GetOptions,
    ) -> Result<String, StorageError> {
        check_path(path)?;
        Ok(format!("{}{}", self.bucket_url_for(options).await?, path))
    }

    /// Delete `path`, and its sidecar signature if it was written signed
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DoesNotExist` if the hub has no file at `path`.
    pub async fn delete_file(&self, path: &str, options: &DeleteOptions) -> Result<(), StorageError> {
        check_path(path)?;
        self.delete_with_reconnect(path).await?;
        if options.was_signed {
            self.delete_with_reconnect(&format!("{}{}", path, SIGNATURE_FILE_SUFFIX))
                .await?;
        }
        tracing::info!("delete_file: deleted {}", path);
        Ok(())
    }

    /// Page through every file in our bucket, handing each name to
    /// `callback` until it returns `false`.
    ///
    /// Returns how many names were handed to `callback`, including the one
    /// it stopped on.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TooManyPages` if the hub keeps handing out
    /// continuation tokens past `max_list_pages`.
    pub async fn list_files<F>(&self, mut callback: F) -> Result<usize, StorageError>
    where
        F: FnMut(&str) -> bool,
    {
        let config = self.hub_config().await?;
        let (config, mut listing) = with_reconnect(
            "list_files",
            config,
            move |config| async move {
                let listing = self.list_page(&config, None).await;
                listing.map(|listing| (config, listing))
            },
            move || self.reconnect(),
        )
        .await?;

        let mut delivered = 0;
        let mut pages = 1;
        loop {
            let entries =
                listing
                    .entries
                    .take()
                    .ok_or_else(|| StorageError::MalformedResponse {
                        operation: "list_files".to_string(),
                        reason: format!("page {} has no entries field", pages),
                    })?;
            for entry in entries.iter().flatten() {
                delivered += 1;
                if !callback(entry) {
                    return Ok(delivered);
                }
            }
            let Some(next) = listing.page.take().filter(|page| !page.is_empty()) else {
                break;
            };
            if pages >= self.config.max_list_pages {
                tracing::warn!(
                    "list_files: hub at {} did not finish within {} pages",
                    config.server,
                    pages
                );
                return Err(StorageError::TooManyPages(pages));
            }
            listing = self.list_page(&config, Some(&next)).await?;
            pages += 1;
        }

        tracing::debug!("list_files: {} entries over {} pages", delivered, pages);
        Ok(delivered)
    }

    fn compose_uploads(
        &self,
        path: &str,
        content: Content,
        options: &PutOptions,
    ) -> Result<Vec<Upload>, StorageError> {
        let content_type = options
            .content_type
            .clone()
            .unwrap_or_else(|| content.default_content_type().to_string());

        match &options.mode {
            WriteMode::Plain => Ok(vec![Upload::new(path, content.into_bytes(), content_type)]),
            WriteMode::Signed { signing_key } => {
                let key = signing_key
                    .as_ref()
                    .unwrap_or_else(|| self.session.app_private_key());
                let signature = sign_ecdsa(key, content.as_bytes());
                Ok(vec![
                    Upload::new(path, content.into_bytes(), content_type),
                    Upload::new(
                        format!("{}{}", path, SIGNATURE_FILE_SUFFIX),
                        serde_json::to_vec(&signature)?,
                        JSON_CONTENT_TYPE,
                    ),
                ])
            }
            WriteMode::Encrypted { recipient } => {
                let cipher_object = self.encrypt(path, &content, recipient.as_ref())?;
                Ok(vec![Upload::new(
                    path,
                    serde_json::to_vec(&cipher_object)?,
                    JSON_CONTENT_TYPE,
                )])
            }
            WriteMode::EncryptedSigned {
                recipient,
                signing_key,
            } => {
                let cipher_object = self.encrypt(path, &content, recipient.as_ref())?;
                let cipher_text = serde_json::to_string(&cipher_object)?;
                let key = signing_key
                    .as_ref()
                    .unwrap_or_else(|| self.session.app_private_key());
                let SignatureObject {
                    signature,
                    public_key,
                } = sign_ecdsa(key, cipher_text.as_bytes());
                let wrapper = SignedCipherObject {
                    signature,
                    public_key,
                    cipher_text,
                };
                Ok(vec![Upload::new(
                    path,
                    serde_json::to_vec(&wrapper)?,
                    JSON_CONTENT_TYPE,
                )])
            }
        }
    }

    fn encrypt(
        &self,
        path: &str,
        content: &Content,
        recipient: Option<&PublicKey>,
    ) -> Result<CipherObject, StorageError> {
        let recipient = recipient
            .cloned()
            .unwrap_or_else(|| self.session.app_private_key().public());
        encrypt_ecies(&recipient, content, self.config.cipher_text_encoding).map_err(|source| {
            StorageError::Encryption {
                path: path.to_string(),
                source,
            }
        })
    }

    fn decrypt_content(
        &self,
        path: &str,
        body: &[u8],
        key: Option<&SecretKey>,
    ) -> Result<Content, StorageError> {
        let cipher_object: CipherObject =
            serde_json::from_slice(body).map_err(|e| StorageError::NotEncrypted {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        let key = key.unwrap_or_else(|| self.session.app_private_key());
        decrypt_ecies(key, &cipher_object).map_err(|e| match e {
            EciesError::MacMismatch => StorageError::Decryption {
                path: path.to_string(),
                source: e,
            },
            other => StorageError::NotEncrypted {
                path: path.to_string(),
                reason: other.to_string(),
            },
        })
    }

    async fn get_verified(
        &self,
        bucket_url: &str,
        path: &str,
        options: &GetOptions,
    ) -> Result<Option<Content>, StorageError> {
        let url = format!("{}{}", bucket_url, path);
        let signature_url = format!("{}{}", url, SIGNATURE_FILE_SUFFIX);
        let (content, signature) =
            futures::future::try_join(self.fetch(&url, path), self.fetch(&signature_url, path))
                .await?;

        let Some(content) = content else {
            return Ok(None);
        };
        let Some(signature) = signature else {
            return Err(StorageError::signature(
                path,
                format!("failed to obtain signature for file at {}", signature_url),
            ));
        };
        let signature: SignatureObject =
            serde_json::from_slice(signature.as_bytes()).map_err(|e| {
                StorageError::signature(path, format!("malformed signature file: {}", e))
            })?;

        let expected = self.expected_signer(options).await?;
        check_signer(path, &expected, &signature.public_key)?;
        if !verify_ecdsa(
            content.as_bytes(),
            &signature.public_key,
            &signature.signature,
        ) {
            tracing::warn!("get_file: signature mismatch on {}", url);
            return Err(StorageError::signature(
                path,
                "content does not match its signature",
            ));
        }
        Ok(Some(content))
    }

    /// Address that must have signed what a read returns
    async fn expected_signer(&self, options: &GetOptions) -> Result<String, StorageError> {
        let app = options
            .app
            .as_deref()
            .unwrap_or_else(|| self.session.app_domain());
        let local = match options.username {
            Some(_) => None,
            None => Some(self.hub_config().await?),
        };
        Ok(resolve_address(
            app,
            options.username.as_deref(),
            self.lookup.as_ref(),
            local.as_ref(),
        )
        .await?)
    }

    /// Bucket URL a read resolves against, always ending in `/`
    async fn bucket_url_for(&self, options: &GetOptions) -> Result<String, StorageError> {
        match options.username.as_deref() {
            Some(username) => {
                let app = options
                    .app
                    .as_deref()
                    .unwrap_or_else(|| self.session.app_domain());
                Ok(resolve_bucket_url(app, Some(username), self.lookup.as_ref(), None).await?)
            }
            None => Ok(self.hub_config().await?.bucket_url()),
        }
    }

    async fn fetch(&self, url: &str, path: &str) -> Result<Option<Content>, StorageError> {
        tracing::debug!("fetch: GET {}", url);
        let request = build_request(Method::GET, url, &[], Bytes::new())?;
        let response = self.transport.send(request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StorageError::from_response("get_file", path, &response));
        }

        let textual = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(is_textual_content_type)
            .unwrap_or(false);
        let body = response.into_body();
        if textual {
            if let Ok(text) = std::str::from_utf8(&body) {
                return Ok(Some(Content::Text(text.to_string())));
            }
        }
        Ok(Some(Content::Binary(body)))
    }

    async fn upload_all(
        &self,
        config: &HubConfig,
        uploads: &[Upload],
    ) -> Result<String, StorageError> {
        let public_urls =
            futures::future::try_join_all(uploads.iter().map(|upload| self.upload(config, upload)))
                .await?;
        public_urls
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::InvalidParameter("nothing to upload".into()))
    }

    async fn upload(&self, config: &HubConfig, upload: &Upload) -> Result<String, StorageError> {
        let url = config.endpoint_url("store", Some(&upload.path));
        tracing::debug!("upload: POST {} ({} bytes)", url, upload.body.len());
        let request = build_request(
            Method::POST,
            &url,
            &[
                (AUTHORIZATION, config.authorization()),
                (CONTENT_TYPE, upload.content_type.clone()),
            ],
            upload.body.clone(),
        )?;
        let response = self.transport.send(request).await?;
        if !response.status().is_success() {
            return Err(StorageError::from_response(
                "put_file",
                &upload.path,
                &response,
            ));
        }
        let stored: StoreResponse = serde_json::from_slice(response.body())?;
        Ok(stored.public_url)
    }

    async fn delete_with_reconnect(&self, path: &str) -> Result<(), StorageError> {
        let config = self.hub_config().await?;
        with_reconnect(
            "delete_file",
            config,
            move |config| async move { self.delete(&config, path).await },
            move || self.reconnect(),
        )
        .await
    }

    async fn delete(&self, config: &HubConfig, path: &str) -> Result<(), StorageError> {
        let url = config.endpoint_url("delete", Some(path));
        tracing::debug!("delete: DELETE {}", url);
        let request = build_request(
            Method::DELETE,
            &url,
            &[(AUTHORIZATION, config.authorization())],
            Bytes::new(),
        )?;
        let response = self.transport.send(request).await?;
        if !response.status().is_success() {
            return Err(StorageError::from_response("delete_file", path, &response));
        }
        Ok(())
    }

    async fn list_page(
        &self,
        config: &HubConfig,
        page: Option<&str>,
    ) -> Result<ListFilesResponse, StorageError> {
        let url = config.endpoint_url("list-files", None);
        tracing::debug!("list_page: POST {} (page {:?})", url, page);
        let body = serde_json::to_vec(&ListFilesRequest { page })?;
        let request = build_request(
            Method::POST,
            &url,
            &[
                (AUTHORIZATION, config.authorization()),
                (CONTENT_TYPE, JSON_CONTENT_TYPE.to_string()),
            ],
            Bytes::from(body),
        )?;
        let response = self.transport.send(request).await?;
        if !response.status().is_success() {
            return Err(StorageError::from_response("list_files", "", &response));
        }
        Ok(serde_json::from_slice(response.body())?)
    }
}

fn check_path(path: &str) -> Result<(), StorageError> {
    if path.is_empty() {
        return Err(StorageError::InvalidParameter(
            "file path must not be empty".into(),
        ));
    }
    Ok(())
}

/// The signer's address must be the bucket owner's address
fn check_signer(path: &str, expected: &str, public_key: &str) -> Result<(), StorageError> {
    let signer = address_from_public_key_hex(public_key)
        .ok_or_else(|| StorageError::signature(path, "signature carries a malformed public key"))?;
    if signer != expected {
        tracing::warn!(
            "get_file: {} was signed by {}, but the bucket belongs to {}",
            path,
            signer,
            expected
        );
        return Err(StorageError::signature(
            path,
            format!(
                "signer address {} does not match bucket owner {}",
                signer, expected
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::{Profile, ResolveError};
    use crate::session::Session;
    use crate::transport::TransportError;

    #[derive(Debug)]
    struct NoNetwork;

    #[async_trait::async_trait]
    impl HubTransport for NoNetwork {
        async fn send(
            &self,
            _request: http::Request<Bytes>,
        ) -> Result<http::Response<Bytes>, TransportError> {
            Err(TransportError::InvalidRequest("offline".into()))
        }
    }

    #[derive(Debug)]
    struct NoProfiles;

    #[async_trait::async_trait]
    impl ProfileLookup for NoProfiles {
        async fn lookup_profile(&self, username: &str) -> Result<Profile, ResolveError> {
            Err(ResolveError::Lookup(username.into(), "offline".into()))
        }
    }

    fn offline_storage() -> Storage<Session, NoNetwork, NoProfiles> {
        let key = SecretKey::generate();
        let config = HubConfig {
            address: key.public().to_address(),
            url_prefix: "https://gaia.example.com/hub/".into(),
            token: "t".into(),
            server: "https://hub.example.com".into(),
            max_file_upload_size_megabytes: None,
        };
        let session = Session::new(key, "https://hub.example.com", "https://app.example.com")
            .with_hub_config(config);
        Storage::new(Arc::new(session), Arc::new(NoNetwork), Arc::new(NoProfiles))
    }

    #[test]
    fn test_compose_plain_keeps_caller_content_type() {
        let storage = offline_storage();
        let options = PutOptions::new(WriteMode::Plain).with_content_type("text/csv");
        let uploads = storage
            .compose_uploads("a.csv", Content::from("a,b"), &options)
            .unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].content_type, "text/csv");
        assert_eq!(uploads[0].body.as_ref(), b"a,b");
    }

    #[test]
    fn test_compose_signed_adds_sidecar() {
        let storage = offline_storage();
        let options = PutOptions::new(WriteMode::Signed { signing_key: None });
        let uploads = storage
            .compose_uploads("a.txt", Content::from("hello"), &options)
            .unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[1].path, "a.txt.sig");
        assert_eq!(uploads[1].content_type, JSON_CONTENT_TYPE);

        let signature: SignatureObject = serde_json::from_slice(&uploads[1].body).unwrap();
        assert!(verify_ecdsa(
            b"hello",
            &signature.public_key,
            &signature.signature
        ));
    }

    #[test]
    fn test_compose_encrypted_signed_signs_cipher_text() {
        let storage = offline_storage();
        let options = PutOptions::new(WriteMode::from_flags(true, true));
        let uploads = storage
            .compose_uploads("a.txt", Content::from("hello"), &options)
            .unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].content_type, JSON_CONTENT_TYPE);

        let wrapper: SignedCipherObject = serde_json::from_slice(&uploads[0].body).unwrap();
        assert!(verify_ecdsa(
            wrapper.cipher_text.as_bytes(),
            &wrapper.public_key,
            &wrapper.signature
        ));
        let content = storage
            .decrypt_content("a.txt", wrapper.cipher_text.as_bytes(), None)
            .unwrap();
        assert_eq!(content, Content::from("hello"));
    }

    #[test]
    fn test_decrypt_plain_text_is_not_encrypted() {
        let storage = offline_storage();
        let result = storage.decrypt_content("a.txt", b"hello", None);
        assert!(matches!(result, Err(StorageError::NotEncrypted { .. })));
    }

    #[test]
    fn test_decrypt_with_wrong_key_is_decryption_error() {
        let storage = offline_storage();
        let uploads = storage
            .compose_uploads("a.txt", Content::from("hello"), &PutOptions::default())
            .unwrap();
        let other = SecretKey::generate();
        let result = storage.decrypt_content("a.txt", &uploads[0].body, Some(&other));
        assert!(matches!(result, Err(StorageError::Decryption { .. })));
    }

    #[test]
    fn test_check_signer() {
        let key = SecretKey::generate();
        let public_key = key.public().to_hex();
        let address = key.public().to_address();
        assert!(check_signer("p", &address, &public_key).is_ok());

        let other = SecretKey::generate().public().to_address();
        assert!(matches!(
            check_signer("p", &other, &public_key),
            Err(StorageError::SignatureVerification { .. })
        ));
        assert!(check_signer("p", &address, "zz").is_err());
    }

    #[tokio::test]
    async fn test_empty_path_is_rejected() {
        let storage = offline_storage();
        assert!(matches!(
            storage.get_file("", &GetOptions::default()).await,
            Err(StorageError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_get_file_url_uses_local_bucket() {
        let storage = offline_storage();
        let address = storage.session().app_private_key().public().to_address();
        let url = storage
            .get_file_url("dir/a.txt", &GetOptions::default())
            .await
            .unwrap();
        assert_eq!(
            url,
            format!("https://gaia.example.com/hub/{}/dir/a.txt", address)
        );
    }

    #[tokio::test]
    async fn test_expected_signer_resolves_bucket_owner() {
        let storage = offline_storage();
        let address = storage.session().app_private_key().public().to_address();
        assert_eq!(
            storage
                .expected_signer(&GetOptions::default())
                .await
                .unwrap(),
            address
        );

        // multiplayer reads go through the profile lookup
        let result = storage
            .expected_signer(&GetOptions::default().from_user("bob.id"))
            .await;
        assert!(matches!(result, Err(StorageError::Resolve(_))));
    }
}
