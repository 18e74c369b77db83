/**
 * File content as the application sees it:
 *  text or binary, with default content types.
 */
pub mod content;
/**
 * Cryptographic types and operations.
 *  - secp256k1 keys and Gaia addresses
 *  - ECIES encryption into cipher objects
 *  - Detached ECDSA signatures
 */
pub mod crypto;
/**
 * Hub connection negotiation.
 * Reads a hub's capabilities and builds the
 *  bearer token (legacy or v1) it will accept.
 */
pub mod hub;
/**
 * Maps a user and app to the bucket URL and
 *  Gaia address their files live under.
 */
pub mod resolver;
/**
 * Credential holder interface and an
 *  in-memory implementation.
 */
pub mod session;
/**
 * Put, get, delete and list files on a hub,
 *  with optional encryption and signing.
 */
pub mod storage;
/**
 * Pluggable HTTP transport.
 */
pub mod transport;

pub mod prelude {
    pub use crate::content::Content;
    pub use crate::crypto::{PublicKey, SecretKey};
    pub use crate::hub::{connect_to_gaia_hub, HubConfig, HubError};
    pub use crate::resolver::{HttpProfileLookup, ProfileLookup};
    pub use crate::session::{Session, SessionStore};
    pub use crate::storage::{
        DeleteOptions, GetOptions, HttpStorage, PutOptions, ReadMode, Storage, StorageConfig,
        StorageError, WriteMode,
    };
    pub use crate::transport::{HubTransport, ReqwestTransport};
}
