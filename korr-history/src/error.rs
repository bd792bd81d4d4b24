use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("history file {path} is truncated or malformed: {reason}")]
    Malformed { path: String, reason: String },
}
