use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManualError {
    #[error("failed to read override file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("override file {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}
