use crate::tree::HierarchyTree;
use korr_config::{ClusterClass, ClusterNodeSpec};
use korr_core::{Alert, ClusterAxis, ClusterGeneralization, NodeId};

const PORT_NAMESPACE: (u64, u64) = (0, u16::MAX as u64);
const IPV4_NAMESPACE: (u64, u64) = (0, u32::MAX as u64);

/// The four generalization trees (spec.md §4.4): one each for source
/// port, destination port, source address, destination address.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    src_port: HierarchyTree,
    dst_port: HierarchyTree,
    src_addr: HierarchyTree,
    dst_addr: HierarchyTree,
}

impl Hierarchy {
    pub fn from_specs(specs: &[ClusterNodeSpec]) -> Self {
        let declared = |class: ClusterClass| {
            specs
                .iter()
                .filter(|s| s.class == class)
                .map(|s| (s.name.clone(), s.range))
                .collect::<Vec<_>>()
        };

        Self {
            src_port: HierarchyTree::build(PORT_NAMESPACE, &declared(ClusterClass::SrcPort)),
            dst_port: HierarchyTree::build(PORT_NAMESPACE, &declared(ClusterClass::DstPort)),
            src_addr: HierarchyTree::build(IPV4_NAMESPACE, &declared(ClusterClass::SrcIpv4)),
            dst_addr: HierarchyTree::build(IPV4_NAMESPACE, &declared(ClusterClass::DstIpv4)),
        }
    }

    pub fn tree(&self, axis: ClusterAxis) -> &HierarchyTree {
        match axis {
            ClusterAxis::SrcPort => &self.src_port,
            ClusterAxis::DstPort => &self.dst_port,
            ClusterAxis::SrcAddr => &self.src_addr,
            ClusterAxis::DstAddr => &self.dst_addr,
        }
    }

    /// Fill in all four generalization pointers for one alert, leaving an
    /// axis `None` when the underlying field is absent (e.g. ports on a
    /// non-TCP/UDP alert) or falls outside every declared tree.
    pub fn label(&mut self, alert: &Alert) -> ClusterGeneralization {
        let src_port_node = alert.src_port().and_then(|p| self.src_port.generalize(p as u64));
        let dst_port_node = alert.dst_port().and_then(|p| self.dst_port.generalize(p as u64));
        let src_addr_node = self.src_addr.generalize(u32::from(alert.ip.src) as u64);
        let dst_addr_node = self.dst_addr.generalize(u32::from(alert.ip.dst) as u64);

        ClusterGeneralization {
            src_port: src_port_node,
            dst_port: dst_port_node,
            src_addr: src_addr_node,
            dst_addr: dst_addr_node,
        }
    }

    pub fn node_range(&self, axis: ClusterAxis, id: NodeId) -> (u64, u64) {
        self.tree(axis).range(id)
    }
}
