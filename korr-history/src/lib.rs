//! Flat-file AlertTypeKey -> occurrence-history store (spec.md §4.3).

mod codec;
mod error;
mod store;

pub use error::HistoryError;
pub use store::{HistoryEntry, HistoryStore};
