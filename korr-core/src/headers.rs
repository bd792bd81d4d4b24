use std::net::Ipv4Addr;

/// IPv4 header fields an alert was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Ipv4Header {
    pub tos: u8,
    pub total_length: u16,
    pub id: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

/// IANA protocol numbers the transport view cares about.
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

/// Raw TCP control bits, kept as a plain bitmask rather than a full
/// `bitflags!` type since only FIN/SYN/RST/ACK are ever inspected.
#[allow(non_upper_case_globals)]
pub mod tcp_flag {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    pub fn has(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

/// Transport-layer view of the packet that triggered an alert. ICMP and
/// other non-TCP/UDP protocols carry no transport view at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Transport {
    Tcp(TcpHeader),
    Udp(UdpHeader),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub length: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
}

impl Transport {
    pub fn src_port(&self) -> Option<u16> {
        match self {
            Transport::Tcp(t) => Some(t.src_port),
            Transport::Udp(u) => Some(u.src_port),
            Transport::Other => None,
        }
    }

    pub fn dst_port(&self) -> Option<u16> {
        match self {
            Transport::Tcp(t) => Some(t.dst_port),
            Transport::Udp(u) => Some(u.dst_port),
            Transport::Other => None,
        }
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, Transport::Tcp(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_exposes_ports_for_tcp_and_udp_only() {
        let tcp = Transport::Tcp(TcpHeader {
            src_port: 1234,
            dst_port: 80,
            seq: 0,
            ack: 0,
            flags: TcpFlags(tcp_flag::SYN),
            window: 0,
            length: 0,
        });
        assert_eq!(tcp.src_port(), Some(1234));
        assert!(tcp.is_tcp());

        assert_eq!(Transport::Other.src_port(), None);
    }

    #[test]
    fn tcp_flags_has_checks_individual_bits() {
        let flags = TcpFlags(tcp_flag::FIN | tcp_flag::ACK);
        assert!(flags.has(tcp_flag::FIN));
        assert!(flags.has(tcp_flag::ACK));
        assert!(!flags.has(tcp_flag::SYN));
    }
}
