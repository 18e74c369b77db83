use std::path::PathBuf;

use clap::Args;

use common::content::is_textual_content_type;
use common::prelude::{Content, PublicKey, PutOptions, StorageError, WriteMode};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Path to store the file at on the hub
    pub path: String,

    /// Local file to upload
    #[arg(long, short, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Literal text to upload
    #[arg(long, short)]
    pub text: Option<String>,

    /// Upload without encrypting
    #[arg(long)]
    pub no_encrypt: bool,

    /// Sign the content (or cipher text, when encrypting)
    #[arg(long)]
    pub sign: bool,

    /// Encrypt to this public key (hex) instead of our own
    #[arg(long)]
    pub recipient: Option<String>,

    /// Content type for unencrypted uploads (guessed from --file otherwise)
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid recipient key: {0}")]
    InvalidRecipient(#[from] common::crypto::KeyError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("nothing to upload; pass --file or --text")]
    NoContent,
}

impl Put {
    fn mode(&self) -> Result<WriteMode, PutError> {
        let recipient = self
            .recipient
            .as_deref()
            .map(PublicKey::from_hex)
            .transpose()?;
        Ok(match (!self.no_encrypt, self.sign) {
            (false, false) => WriteMode::Plain,
            (false, true) => WriteMode::Signed { signing_key: None },
            (true, false) => WriteMode::Encrypted { recipient },
            (true, true) => WriteMode::EncryptedSigned {
                recipient,
                signing_key: None,
            },
        })
    }

    /// Content plus the content type guessed for it
    fn content(&self) -> Result<(Content, Option<String>), PutError> {
        if let Some(text) = &self.text {
            return Ok((Content::from(text.as_str()), None));
        }
        let Some(file) = &self.file else {
            return Err(PutError::NoContent);
        };

        let data = std::fs::read(file).map_err(|e| PutError::Read(file.clone(), e))?;
        let guessed = mime_guess::from_path(file).first().map(|mime| mime.to_string());
        let textual = guessed.as_deref().is_some_and(is_textual_content_type);
        let content = match String::from_utf8(data) {
            Ok(text) if textual => Content::Text(text),
            Ok(text) => Content::from(text.into_bytes()),
            Err(e) => Content::from(e.into_bytes()),
        };
        Ok((content, guessed))
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (content, guessed) = self.content()?;
        let mut options = PutOptions::new(self.mode()?);
        options.content_type = self.content_type.clone().or(guessed);

        let storage = ctx.storage()?;
        let size = content.len();
        let url = storage.put_file(&self.path, content, &options).await?;
        tracing::info!("uploaded {} bytes to {}", size, self.path);
        Ok(url)
    }
}
