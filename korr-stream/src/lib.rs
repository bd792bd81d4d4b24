//! Live TCP flow index keyed by (source IP, destination port), used to
//! attach flow context to alerts and expire idle flows (spec.md §4.1).

mod flow;
mod tracker;

pub use flow::{Flow, Segment};
pub use tracker::StreamTracker;
