use std::path::PathBuf;

use clap::Args;

use common::prelude::{Content, GetOptions, ReadMode, StorageError};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Get {
    /// Path of the file on the hub
    pub path: String,

    /// The file was stored unencrypted
    #[arg(long)]
    pub no_decrypt: bool,

    /// Require a valid signature from the bucket owner
    #[arg(long)]
    pub verify: bool,

    /// Read from this user's bucket instead of our own
    #[arg(long, short)]
    pub username: Option<String>,

    /// App whose bucket to read (defaults to the configured app domain)
    #[arg(long)]
    pub app: Option<String>,

    /// Only print the file's public URL
    #[arg(long)]
    pub url: bool,

    /// Write the content here instead of printing it
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("{0} is binary; pass --output to save it")]
    Binary(String),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Get {
    type Error = GetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut options = GetOptions::new(ReadMode::from_flags(!self.no_decrypt, self.verify));
        options.username = self.username.clone();
        options.app = self.app.clone();

        let storage = ctx.storage()?;
        if self.url {
            return Ok(storage.get_file_url(&self.path, &options).await?);
        }

        let content = storage
            .get_file(&self.path, &options)
            .await?
            .ok_or_else(|| GetError::NotFound(self.path.clone()))?;

        match (&self.output, content) {
            (Some(output), content) => {
                let size = content.len();
                std::fs::write(output, content.as_bytes())
                    .map_err(|e| GetError::Write(output.clone(), e))?;
                Ok(format!("wrote {} bytes to {}", size, output.display()))
            }
            (None, Content::Text(text)) => Ok(text),
            (None, Content::Binary(_)) => Err(GetError::Binary(self.path.clone())),
        }
    }
}
