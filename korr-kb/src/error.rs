use thiserror::Error;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}
