use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed alert record: {reason}")]
    Malformed { reason: String },

    #[error("database error: {0}")]
    Db(String),
}
