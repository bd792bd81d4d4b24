use std::net::Ipv4Addr;

/// Key identifying a tracked TCP/UDP flow: (source address, destination port).
/// Matches the Stream Tracker's hash key (C1) exactly so alerts can carry a
/// lightweight back-reference instead of owning the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FlowKey {
    pub src_addr: Ipv4Addr,
    pub dst_port: u16,
}

impl FlowKey {
    pub const fn new(src_addr: Ipv4Addr, dst_port: u16) -> Self {
        Self { src_addr, dst_port }
    }
}
