use clap::Args;

use common::prelude::SecretKey;

use crate::state::{AppConfig, AppState, DEFAULT_APP_DOMAIN, DEFAULT_HUB_URL};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Hub to store files on
    #[arg(long, default_value = DEFAULT_HUB_URL)]
    pub hub_url: String,

    /// App origin files are stored under
    #[arg(long, default_value = DEFAULT_APP_DOMAIN)]
    pub app_domain: String,

    /// Association token to present to the hub
    #[arg(long)]
    pub association_token: Option<String>,

    /// Profile lookup endpoint used for multiplayer reads
    #[arg(long)]
    pub profile_lookup_url: Option<String>,

    /// Import an existing app private key (hex) instead of generating one
    #[arg(long, env = "GAIA_APP_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
    #[error("invalid private key: {0}")]
    InvalidKey(#[from] common::crypto::KeyError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let key = self
            .private_key
            .as_deref()
            .map(SecretKey::from_hex)
            .transpose()?;
        let config = AppConfig {
            hub_url: self.hub_url.clone(),
            app_domain: self.app_domain.clone(),
            association_token: self.association_token.clone(),
            profile_lookup_url: self.profile_lookup_url.clone(),
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config), key)?;
        let address = state.load_key()?.public().to_address();

        Ok(format!(
            "Initialized gaia directory at: {}\n\
             - Key: {}\n\
             - Config: {}\n\
             - Hub: {}\n\
             - App domain: {}\n\
             - Address: {}",
            state.gaia_dir.display(),
            state.key_path.display(),
            state.config_path.display(),
            state.config.hub_url,
            state.config.app_domain,
            address
        ))
    }
}
