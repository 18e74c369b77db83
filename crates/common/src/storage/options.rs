use serde::{Deserialize, Serialize};

use crate::crypto::{CipherTextEncoding, PublicKey, SecretKey};
use crate::resolver::DEFAULT_PROFILE_LOOKUP_URL;

/// Fixed suffix of sidecar signature files
pub const SIGNATURE_FILE_SUFFIX: &str = ".sig";

/// Default ceiling on listing pages
pub const DEFAULT_MAX_LIST_PAGES: usize = 65536;

/// How content is wrapped before it is uploaded
#[derive(Debug, Clone)]
pub enum WriteMode {
    /// Upload the content as-is
    Plain,
    /// Upload as-is plus a sidecar signature at `{path}.sig`
    Signed {
        /// Defaults to the session's app key
        signing_key: Option<SecretKey>,
    },
    /// Upload a `CipherObject`
    Encrypted {
        /// Defaults to the session's app public key
        recipient: Option<PublicKey>,
    },
    /// Encrypt, then sign the cipher text, and upload the signed wrapper
    EncryptedSigned {
        recipient: Option<PublicKey>,
        signing_key: Option<SecretKey>,
    },
}

impl Default for WriteMode {
    fn default() -> Self {
        WriteMode::Encrypted { recipient: None }
    }
}

impl WriteMode {
    /// Mode for a pair of `encrypt`/`sign` switches, using session keys
    pub fn from_flags(encrypt: bool, sign: bool) -> Self {
        match (encrypt, sign) {
            (false, false) => WriteMode::Plain,
            (false, true) => WriteMode::Signed { signing_key: None },
            (true, false) => WriteMode::Encrypted { recipient: None },
            (true, true) => WriteMode::EncryptedSigned {
                recipient: None,
                signing_key: None,
            },
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(
            self,
            WriteMode::Encrypted { .. } | WriteMode::EncryptedSigned { .. }
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            WriteMode::Signed { .. } | WriteMode::EncryptedSigned { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub mode: WriteMode,
    /// Only used for `Plain` and `Signed` uploads; wrapped payloads are
    /// always JSON
    pub content_type: Option<String>,
}

impl PutOptions {
    pub fn new(mode: WriteMode) -> Self {
        Self {
            mode,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// What a read must check or undo before handing content back
#[derive(Debug, Clone)]
pub enum ReadMode {
    Plain,
    /// Require a valid sidecar signature from the bucket's owner
    Verify,
    Decrypt {
        /// Defaults to the session's app key
        key: Option<SecretKey>,
    },
    /// Require a valid signed wrapper from the bucket's owner, then decrypt
    DecryptVerify { key: Option<SecretKey> },
}

impl Default for ReadMode {
    fn default() -> Self {
        ReadMode::Decrypt { key: None }
    }
}

impl ReadMode {
    pub fn from_flags(decrypt: bool, verify: bool) -> Self {
        match (decrypt, verify) {
            (false, false) => ReadMode::Plain,
            (false, true) => ReadMode::Verify,
            (true, false) => ReadMode::Decrypt { key: None },
            (true, true) => ReadMode::DecryptVerify { key: None },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub mode: ReadMode,
    /// Read from this user's bucket instead of our own
    pub username: Option<String>,
    /// App whose bucket to read in a multiplayer read; defaults to the
    /// session's app domain
    pub app: Option<String>,
}

impl GetOptions {
    pub fn new(mode: ReadMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn from_user(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn for_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Also delete the `{path}.sig` sidecar
    pub was_signed: bool,
}

/// Tunables for the file protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_max_list_pages")]
    pub max_list_pages: usize,
    #[serde(default = "default_profile_lookup_url")]
    pub profile_lookup_url: String,
    #[serde(default)]
    pub cipher_text_encoding: CipherTextEncoding,
}

fn default_max_list_pages() -> usize {
    DEFAULT_MAX_LIST_PAGES
}

fn default_profile_lookup_url() -> String {
    DEFAULT_PROFILE_LOOKUP_URL.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_list_pages: default_max_list_pages(),
            profile_lookup_url: default_profile_lookup_url(),
            cipher_text_encoding: CipherTextEncoding::default(),
        }
    }
}
