/// Index into a hierarchy tree's arena (owned by `korr-cluster`). `u32`
/// rather than a pointer so trees can be rebuilt off to the side and
/// atomically swapped in (see design note in SPEC_FULL.md §4.4).
pub type NodeId = u32;

/// The four axes an alert can be generalized along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ClusterAxis {
    SrcPort,
    DstPort,
    SrcAddr,
    DstAddr,
}

pub const CLUSTER_AXES: [ClusterAxis; 4] = [
    ClusterAxis::SrcPort,
    ClusterAxis::DstPort,
    ClusterAxis::SrcAddr,
    ClusterAxis::DstAddr,
];

/// An alert's generalization pointers on each axis. A `None` entry means
/// the field's value fell outside every tree on that axis and was left
/// ungeneralized (spec.md §4.4 edge case).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClusterGeneralization {
    pub src_port: Option<NodeId>,
    pub dst_port: Option<NodeId>,
    pub src_addr: Option<NodeId>,
    pub dst_addr: Option<NodeId>,
}

impl ClusterGeneralization {
    pub fn get(&self, axis: ClusterAxis) -> Option<NodeId> {
        match axis {
            ClusterAxis::SrcPort => self.src_port,
            ClusterAxis::DstPort => self.dst_port,
            ClusterAxis::SrcAddr => self.src_addr,
            ClusterAxis::DstAddr => self.dst_addr,
        }
    }

    pub fn set(&mut self, axis: ClusterAxis, node: NodeId) {
        match axis {
            ClusterAxis::SrcPort => self.src_port = Some(node),
            ClusterAxis::DstPort => self.dst_port = Some(node),
            ClusterAxis::SrcAddr => self.src_addr = Some(node),
            ClusterAxis::DstAddr => self.dst_addr = Some(node),
        }
    }

    /// True once every axis that *can* be generalized has been.
    pub fn is_complete(&self) -> bool {
        self.src_port.is_some()
            && self.dst_port.is_some()
            && self.src_addr.is_some()
            && self.dst_addr.is_some()
    }
}
