//! Output Serializer (C11): persists alerts, their IP/TCP headers, flow
//! payloads, cluster generalizations and correlation edges to the output
//! database (spec.md §4.11).

mod batch;
mod error;
mod sink;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;

pub use batch::{persist_batch, Edge, PersistReport};
pub use error::OutdbError;
pub use sink::{AlertRecord, OutputSink};

#[cfg(feature = "mysql")]
pub use mysql::MySqlSink;
#[cfg(feature = "postgres")]
pub use postgres::PostgresSink;
