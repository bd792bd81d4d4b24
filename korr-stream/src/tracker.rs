use crate::flow::{Flow, Segment};
use korr_core::flow::FlowKey;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Indexes live TCP flows by (source IP, destination port). Single-writer
/// discipline: all mutation goes through `&self` methods behind an
/// internal `Mutex` rather than exposing the map directly.
#[derive(Debug)]
pub struct StreamTracker {
    flows: Mutex<HashMap<FlowKey, Flow>>,
    start_time: i64,
    idle_horizon_secs: i64,
}

impl StreamTracker {
    pub fn new(start_time: i64, idle_horizon_secs: i64) -> Self {
        Self {
            flows: Mutex::new(HashMap::new()),
            start_time,
            idle_horizon_secs,
        }
    }

    /// Append a TCP segment to its flow, creating the flow if absent.
    /// Malformed packets (caught upstream by the ingestor) never reach
    /// here; out-of-memory on insert is allowed to panic and bubble up,
    /// per spec.md §4.1's "out-of-memory is fatal".
    pub fn enqueue(&self, key: FlowKey, segment: Segment) {
        let mut flows = self.flows.lock();
        let flow = flows.entry(key).or_default();
        if flow.enqueue(segment) {
            flows.remove(&key);
        }
    }

    pub fn lookup(&self, key: &FlowKey) -> Option<Flow> {
        let flows = self.flows.lock();
        let flow = flows.get(key)?;
        let last_seen = flow.last_seen()?;
        if last_seen >= self.start_time {
            Some(flow.clone())
        } else {
            None
        }
    }

    pub fn mark_observed(&self, key: &FlowKey) {
        if let Some(flow) = self.flows.lock().get_mut(key) {
            flow.observed = true;
        }
    }

    /// Drop every non-observed flow whose most recent segment is older
    /// than the idle horizon.
    pub fn sweep(&self, now: i64) {
        let mut flows = self.flows.lock();
        flows.retain(|_, flow| {
            flow.observed
                || flow
                    .last_seen()
                    .map(|t| now - t < self.idle_horizon_secs)
                    .unwrap_or(true)
        });
    }

    pub fn len(&self) -> usize {
        self.flows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use korr_core::headers::{tcp_flag, Ipv4Header, TcpFlags, TcpHeader};
    use std::net::Ipv4Addr;

    fn seg(seq: u32, flags: u8, ts: i64) -> Segment {
        Segment {
            ip: Ipv4Header {
                tos: 0,
                total_length: 40,
                id: 1,
                ttl: 64,
                protocol: korr_core::headers::PROTO_TCP,
                src: Ipv4Addr::new(10, 0, 0, 1),
                dst: Ipv4Addr::new(10, 0, 0, 2),
            },
            tcp: TcpHeader {
                src_port: 4444,
                dst_port: 80,
                seq,
                ack: 0,
                flags: TcpFlags(flags),
                window: 0,
                length: 0,
            },
            timestamp: ts,
        }
    }

    fn key() -> FlowKey {
        FlowKey::new(Ipv4Addr::new(10, 0, 0, 1), 80)
    }

    #[test]
    fn enqueue_orders_segments_by_sequence_number() {
        let tracker = StreamTracker::new(0, 300);
        tracker.enqueue(key(), seg(200, tcp_flag::ACK, 1));
        tracker.enqueue(key(), seg(100, tcp_flag::ACK, 2));
        let flow = tracker.lookup(&key()).unwrap();
        assert_eq!(flow.segments[0].tcp.seq, 100);
        assert_eq!(flow.segments[1].tcp.seq, 200);
    }

    #[test]
    fn rst_drops_unobserved_flow() {
        let tracker = StreamTracker::new(0, 300);
        tracker.enqueue(key(), seg(100, tcp_flag::SYN, 1));
        tracker.enqueue(key(), seg(200, tcp_flag::RST, 2));
        assert!(tracker.lookup(&key()).is_none());
    }

    #[test]
    fn rst_does_not_drop_observed_flow() {
        let tracker = StreamTracker::new(0, 300);
        tracker.enqueue(key(), seg(100, tcp_flag::SYN, 1));
        tracker.mark_observed(&key());
        tracker.enqueue(key(), seg(200, tcp_flag::RST, 2));
        assert!(tracker.lookup(&key()).is_some());
    }

    #[test]
    fn ack_after_fin_drops_unobserved_flow() {
        let tracker = StreamTracker::new(0, 300);
        tracker.enqueue(key(), seg(100, tcp_flag::FIN, 1));
        tracker.enqueue(key(), seg(101, tcp_flag::ACK, 2));
        assert!(tracker.lookup(&key()).is_none());
    }

    #[test]
    fn lookup_rejects_flows_older_than_start_time() {
        let tracker = StreamTracker::new(1000, 300);
        tracker.enqueue(key(), seg(100, tcp_flag::ACK, 5));
        assert!(tracker.lookup(&key()).is_none());
    }

    #[test]
    fn sweep_evicts_idle_unobserved_flows_only() {
        let tracker = StreamTracker::new(0, 10);
        tracker.enqueue(key(), seg(100, tcp_flag::ACK, 1));
        tracker.mark_observed(&key());
        tracker.sweep(1000);
        assert_eq!(tracker.len(), 1, "observed flow survives sweep");

        let other = FlowKey::new(Ipv4Addr::new(10, 0, 0, 9), 443);
        tracker.enqueue(other, seg(1, tcp_flag::ACK, 1));
        tracker.sweep(1000);
        assert_eq!(tracker.len(), 1, "idle unobserved flow is evicted");
    }
}
