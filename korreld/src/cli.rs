use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "korreld", about = "Alert correlation daemon")]
pub struct Cli {
    /// Path to the TOML configuration file. Falls back to `$KORR_CONFIG`,
    /// then `./korrelator.toml`, then built-in defaults.
    #[arg(long, env = "KORR_CONFIG")]
    pub config: Option<PathBuf>,
}
