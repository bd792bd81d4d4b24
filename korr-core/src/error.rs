use thiserror::Error;

/// Errors raised while constructing or validating core data-model values
/// (malformed header fields, out-of-range ports, and similar). Components
/// define their own richer error enums for their own concerns; this one
/// stays small since the model itself is mostly plain data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid protocol field: {0}")]
    InvalidProtocol(u8),

    #[error("invalid IPv4 address literal: {0}")]
    InvalidAddress(String),
}
