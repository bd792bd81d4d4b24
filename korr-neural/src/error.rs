use std::io;

#[derive(Debug, thiserror::Error)]
pub enum NeuralError {
    #[error("I/O error on SOM file {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("malformed SOM file {path}: {reason}")]
    Malformed { path: String, reason: String },
}
