use clap::Args;

use common::hub::{get_hub_info, HubError};
use common::prelude::StorageError;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct HubInfo {
    /// Also negotiate a token and show the resulting connection
    #[arg(long)]
    pub connect: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum HubInfoError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[async_trait::async_trait]
impl crate::op::Op for HubInfo {
    type Error = HubInfoError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state().map_err(ContextError::from)?;
        let transport =
            common::transport::ReqwestTransport::new().map_err(HubError::Transport)?;
        let info = get_hub_info(&transport, &state.config.hub_url).await?;

        let mut lines = vec![
            format!("Hub: {}", state.config.hub_url),
            format!("Read URL prefix: {}", info.read_url_prefix),
            format!("Auth version: v{}", info.auth_version()),
        ];
        if let Some(megabytes) = info.max_file_upload_size_megabytes {
            lines.push(format!("Max upload size: {} MB", megabytes));
        }

        if self.connect {
            let storage = ctx.storage()?;
            let config = storage.reconnect().await?;
            lines.push(format!("Address: {}", config.address));
            lines.push(format!("Bucket URL: {}", config.bucket_url()));
        }

        Ok(lines.join("\n"))
    }
}
