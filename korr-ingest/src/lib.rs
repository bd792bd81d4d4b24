//! Alert Ingestor (C2): reads raw Snort-style alerts from either a tailed
//! text log or a polled database table, attaches Stream Tracker flow
//! context to TCP alerts, and hands callers a deep-copied, timestamp-
//! ordered snapshot on demand (spec.md §4.2).

#[cfg(any(feature = "postgres", feature = "mysql"))]
mod db;
mod error;
mod record;
mod source;
mod text;

#[cfg(any(feature = "postgres", feature = "mysql"))]
pub use db::{Cursor, DbBackend, DbPollSource, DbRow};
pub use error::IngestError;
pub use record::{parse_endpoints, parse_header, parse_payload_line, parse_priority_classification, RecordBuilder};
pub use source::{AlertBuffer, AlertSource};
pub use text::TextTailSource;

#[cfg(feature = "postgres")]
pub use db::postgres::PostgresBackend;
#[cfg(feature = "mysql")]
pub use db::mysql::MySqlBackend;
