//! History-based bayesian correlation coefficient between alert type
//! keys (spec.md §4.5).

mod index;

pub use index::BayesianIndex;
