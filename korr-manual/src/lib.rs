//! Manual Override Store (C10): force-correlate/force-uncorrelate
//! directives between alert types, reparsed on a period and swapped in
//! atomically (spec.md §4.10).

mod error;
mod pair;
mod store;

pub use error::ManualError;
pub use pair::{parse_pairs_xml, ManualPair};
pub use store::{resolve_override, ManualStore, Verdict};
