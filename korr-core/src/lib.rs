//! Shared data model for the alert correlation engine: the `Alert` record
//! itself, its identifying type key, header views, flow back-references,
//! and the small cross-cutting types (cluster generalization pointers,
//! hyperalert bindings) that more than one component needs to agree on.
//!
//! Component-owned types (history entries, hierarchy trees, SOM weights,
//! manual pairs, correlation edges) live in their owning crate instead of
//! here, so this crate stays a leaf every other component can depend on
//! without pulling in unrelated machinery.

pub mod alert;
pub mod cluster;
pub mod error;
pub mod flow;
pub mod headers;
pub mod hyperalert;
pub mod key;

pub use alert::Alert;
pub use cluster::{ClusterAxis, ClusterGeneralization, NodeId, CLUSTER_AXES};
pub use error::CoreError;
pub use flow::FlowKey;
pub use headers::{tcp_flag, Ipv4Header, TcpFlags, TcpHeader, Transport, UdpHeader, PROTO_TCP, PROTO_UDP};
pub use hyperalert::HyperAlertBinding;
pub use key::AlertTypeKey;
