pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gaia")]
#[command(version, about = "Store and fetch files on a Gaia hub")]
pub struct Args {
    /// Path to the gaia config directory (defaults to ~/.gaia)
    #[arg(long, global = true, env = "GAIA_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: crate::Command,
}
