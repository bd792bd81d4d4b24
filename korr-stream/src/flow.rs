use korr_core::headers::{tcp_flag, Ipv4Header, TcpHeader};

/// One observed TCP segment, enough to reconstruct sequence order and
/// detect the FIN/ACK and RST close patterns (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub ip: Ipv4Header,
    pub tcp: TcpHeader,
    pub timestamp: i64,
}

/// A live TCP flow keyed by (source IP, destination port). Segments are
/// kept in TCP-sequence order; `observed` is the sticky flag set once an
/// alert attaches to this flow, which prevents both RST/FIN-ACK teardown
/// and idle eviction.
#[derive(Debug, Clone, Default)]
pub struct Flow {
    pub segments: Vec<Segment>,
    pub observed: bool,
}

impl Flow {
    pub fn last_seen(&self) -> Option<i64> {
        self.segments.last().map(|s| s.timestamp)
    }

    /// Insert `segment` in TCP-sequence order, then apply the two drop
    /// rules. Returns `true` if the flow should be dropped by the caller.
    pub fn enqueue(&mut self, segment: Segment) -> bool {
        let seq = segment.tcp.seq;
        let insert_at = self
            .segments
            .iter()
            .position(|s| s.tcp.seq > seq)
            .unwrap_or(self.segments.len());

        let prev_tail_fin = self
            .segments
            .last()
            .map(|s| s.tcp.flags.has(tcp_flag::FIN))
            .unwrap_or(false);

        self.segments.insert(insert_at, segment);

        if !self.observed {
            if segment.tcp.flags.has(tcp_flag::RST) {
                return true;
            }
            if segment.tcp.flags.has(tcp_flag::ACK) && prev_tail_fin {
                return true;
            }
        }

        false
    }
}
