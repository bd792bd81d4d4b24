use thiserror::Error;

/// Configuration errors are fatal at startup (spec.md §7): missing
/// mandatory keys, malformed ranges, unknown classes, or a file that
/// doesn't parse as TOML.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Validation { key: String, reason: String },
}
