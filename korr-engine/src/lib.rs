//! Correlation Engine (C9): combines the bayesian, knowledge-base, and
//! plugin-supplied indices into a single weighted coefficient per ordered
//! alert pair, thresholds the resulting distribution, and resolves manual
//! overrides into the final correlation graph (spec.md §4.9).
//!
//! The phase's snapshot is taken by the caller (an immutable `&[Alert]`
//! handed in here) rather than owned by this crate, per the "explicit
//! snapshot instead of a coarse lock" design note: this crate never holds
//! a lock across a whole phase.

mod combine;
mod error;
mod weights;

pub use combine::{enrich, score_and_threshold, CorrelationEdge};
pub use error::EngineError;
pub use weights::Weights;
