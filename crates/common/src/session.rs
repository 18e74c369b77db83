use parking_lot::RwLock;

use crate::crypto::SecretKey;
use crate::hub::HubConfig;

/// Credential holder for a signed-in user.
///
/// Supplies the app private key, the hub to talk to, and the current hub
/// connection. The file protocol never reaches into ambient state; everything
/// it needs about the user comes through here.
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Key that owns the app's hub namespace
    fn app_private_key(&self) -> &SecretKey;

    /// Base URL of the user's hub
    fn hub_url(&self) -> &str;

    /// Origin of the running app, used as the default `app` in multiplayer
    /// reads
    fn app_domain(&self) -> &str;

    /// Credential letting the app key write on behalf of another identity
    fn association_token(&self) -> Option<&str>;

    /// The current hub connection, if one has been negotiated
    fn hub_config(&self) -> Option<HubConfig>;

    /// Swap in a freshly negotiated connection
    fn set_hub_config(&self, config: HubConfig);
}

/// In-memory session
#[derive(Debug)]
pub struct Session {
    app_private_key: SecretKey,
    hub_url: String,
    app_domain: String,
    association_token: Option<String>,
    hub_config: RwLock<Option<HubConfig>>,
}

impl Session {
    pub fn new(
        app_private_key: SecretKey,
        hub_url: impl Into<String>,
        app_domain: impl Into<String>,
    ) -> Self {
        Self {
            app_private_key,
            hub_url: hub_url.into(),
            app_domain: app_domain.into(),
            association_token: None,
            hub_config: RwLock::new(None),
        }
    }

    pub fn with_association_token(mut self, token: impl Into<String>) -> Self {
        self.association_token = Some(token.into());
        self
    }

    /// Start from a previously negotiated connection
    pub fn with_hub_config(self, config: HubConfig) -> Self {
        *self.hub_config.write() = Some(config);
        self
    }
}

impl SessionStore for Session {
    fn app_private_key(&self) -> &SecretKey {
        &self.app_private_key
    }

    fn hub_url(&self) -> &str {
        &self.hub_url
    }

    fn app_domain(&self) -> &str {
        &self.app_domain
    }

    fn association_token(&self) -> Option<&str> {
        self.association_token.as_deref()
    }

    fn hub_config(&self) -> Option<HubConfig> {
        self.hub_config.read().clone()
    }

    fn set_hub_config(&self, config: HubConfig) {
        *self.hub_config.write() = Some(config);
    }
}
