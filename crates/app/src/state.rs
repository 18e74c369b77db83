use std::{fs, path::PathBuf};

use common::prelude::SecretKey;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "gaia";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.pem";

pub const DEFAULT_HUB_URL: &str = "https://hub.blockstack.org";
pub const DEFAULT_APP_DOMAIN: &str = "https://gaia.cli";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hub to negotiate with for writes
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    /// App origin our files are stored under, and the default app for
    /// multiplayer reads
    #[serde(default = "default_app_domain")]
    pub app_domain: String,
    /// Lets the app key write on behalf of another identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_token: Option<String>,
    /// Override for the username -> profile lookup endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_lookup_url: Option<String>,
}

fn default_hub_url() -> String {
    DEFAULT_HUB_URL.to_string()
}

fn default_app_domain() -> String {
    DEFAULT_APP_DOMAIN.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hub_url: default_hub_url(),
            app_domain: default_app_domain(),
            association_token: None,
            profile_lookup_url: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the gaia directory (~/.gaia)
    pub gaia_dir: PathBuf,
    /// Path to the app private key PEM file
    pub key_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the gaia directory path (custom or default ~/.gaia)
    pub fn gaia_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new gaia state directory.
    ///
    /// Generates an app key unless one is supplied.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
        key: Option<SecretKey>,
    ) -> Result<Self, StateError> {
        let gaia_dir = Self::gaia_dir(custom_path)?;

        if gaia_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&gaia_dir)?;

        let key = key.unwrap_or_else(SecretKey::generate);
        let key_path = gaia_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, key.to_pem())?;

        let config = config.unwrap_or_default();
        let config_path = gaia_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            gaia_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the gaia directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let gaia_dir = Self::gaia_dir(custom_path)?;

        if !gaia_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = gaia_dir.join(KEY_FILE_NAME);
        let config_path = gaia_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            gaia_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load the app private key from the key file
    pub fn load_key(&self) -> Result<SecretKey, StateError> {
        let pem = fs::read_to_string(&self.key_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("gaia directory not initialized. Run 'gaia init' first")]
    NotInitialized,

    #[error("gaia directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
