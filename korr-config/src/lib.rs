//! Configuration loading for the korrelator daemon: TOML file plus
//! `KORR_*` environment overrides, validated before use (spec.md §6).

mod config;
mod env;
mod error;
mod schema;

pub use config::{load_config, load_from_file};
pub use env::apply_env_overrides;
pub use error::ConfigError;
pub use schema::{ClusterClass, ClusterNodeSpec, Config, DatabaseConfig, DbKind};
