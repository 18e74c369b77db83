use clap::Args;

use common::prelude::StorageError;

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Stop after this many entries
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[async_trait::async_trait]
impl crate::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let storage = ctx.storage()?;
        let limit = self.limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return Ok(String::new());
        }

        let mut names = Vec::new();
        storage
            .list_files(|name| {
                names.push(name.to_string());
                names.len() < limit
            })
            .await?;

        if names.is_empty() {
            Ok("No files found".to_string())
        } else {
            Ok(names.join("\n"))
        }
    }
}
