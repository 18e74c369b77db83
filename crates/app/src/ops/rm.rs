use clap::Args;

use common::prelude::{DeleteOptions, StorageError};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Path of the file on the hub
    pub path: String,

    /// Also delete the file's signature
    #[arg(long)]
    pub was_signed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let storage = ctx.storage()?;
        let options = DeleteOptions {
            was_signed: self.was_signed,
        };
        storage.delete_file(&self.path, &options).await?;
        Ok(format!("deleted {}", self.path))
    }
}
