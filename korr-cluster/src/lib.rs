//! Hierarchical field generalization and alert clustering (spec.md §4.4).

mod collapse;
mod hierarchy;
mod tree;

pub use collapse::collapse;
pub use hierarchy::Hierarchy;
pub use tree::{HierarchyTree, ROOT};
