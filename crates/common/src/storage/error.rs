use bytes::Bytes;
use http::{Response, StatusCode};

use crate::crypto::{EciesError, KeyError};
use crate::hub::HubError;
use crate::resolver::ResolveError;
use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("hub error: {0}")]
    Hub(#[from] HubError),
    #[error("address resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encryption failed for {path}: {source}")]
    Encryption { path: String, source: EciesError },
    /// The content parsed as a cipher object but failed the MAC check
    #[error("decryption failed for {path}: {source}")]
    Decryption { path: String, source: EciesError },
    /// The content could not be read as a cipher object at all
    #[error("failed to decrypt {path}; the content may not actually be encrypted: {reason}")]
    NotEncrypted { path: String, reason: String },
    #[error("signature verification failed for {path}: {reason}")]
    SignatureVerification { path: String, reason: String },
    #[error("file does not exist: {0}")]
    DoesNotExist(String),
    #[error("precondition failed for {0}; the file was modified concurrently")]
    PreconditionFailed(String),
    #[error("payload for {path} is {size} bytes, over the hub limit of {limit} bytes")]
    PayloadTooLarge { path: String, size: usize, limit: u64 },
    #[error("hub rejected our credentials during {0}")]
    Unauthorized(String),
    #[error("hub returned HTTP {status} during {operation}: {body}")]
    RemoteService {
        operation: String,
        status: StatusCode,
        body: String,
    },
    /// A 2xx response whose body is not what the protocol promises
    #[error("hub sent a malformed response during {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },
    #[error("listing did not finish within {0} pages")]
    TooManyPages(usize),
}

impl StorageError {
    /// Whether a fresh hub connection might make a retry succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::Unauthorized(_) => true,
            StorageError::RemoteService { status, .. } => status.is_server_error(),
            StorageError::Transport(e) => e.is_network(),
            _ => false,
        }
    }

    pub(crate) fn signature(path: &str, reason: impl Into<String>) -> Self {
        StorageError::SignatureVerification {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify a non-2xx hub response
    pub(crate) fn from_response(operation: &str, path: &str, response: &Response<Bytes>) -> Self {
        let body = String::from_utf8_lossy(response.body()).to_string();
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                StorageError::Unauthorized(operation.to_string())
            }
            StatusCode::NOT_FOUND => StorageError::DoesNotExist(path.to_string()),
            StatusCode::PRECONDITION_FAILED => StorageError::PreconditionFailed(path.to_string()),
            status => StorageError::RemoteService {
                operation: operation.to_string(),
                status,
                body,
            },
        }
    }
}
