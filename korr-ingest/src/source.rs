use crate::error::IngestError;
use korr_core::Alert;
use std::sync::Mutex;

/// An alert ingestion source: a tailed text log (spec.md §4.2's text
/// source) or a polled database table (the DB-poll source). Both push
/// newly observed alerts into an internal buffer; [`AlertSource::list`]
/// hands the caller a deep-copied snapshot of everything collected since
/// the last call, never aliasing the live buffer.
pub trait AlertSource {
    /// Pull whatever new alerts are available from the underlying source
    /// into the internal buffer. Returns the number of alerts appended.
    fn poll(&self) -> Result<usize, IngestError>;

    /// Take a deep-copied snapshot of every buffered alert collected so
    /// far, in non-decreasing timestamp order, and clear the buffer.
    fn list(&self) -> Vec<Alert>;
}

/// Shared append-only buffer used by both concrete sources. Kept behind a
/// plain [`Mutex`] rather than a lock-free structure: alerts are only
/// ever appended by the single poll loop that owns this source and drained
/// in bulk by the caller, so there is no read/write contention to avoid.
#[derive(Debug, Default)]
pub struct AlertBuffer {
    alerts: Mutex<Vec<Alert>>,
}

impl AlertBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }

    /// Deep-copy every buffered alert out, then clear. `Alert` is plain
    /// owned data (`Clone`), so the "copy, never alias" discipline falls
    /// out of a `Vec::drain` for free here.
    pub fn drain_sorted(&self) -> Vec<Alert> {
        let mut alerts = self.alerts.lock().unwrap();
        let mut snapshot: Vec<Alert> = alerts.drain(..).collect();
        snapshot.sort_by_key(|a| a.timestamp);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use korr_core::headers::{Ipv4Header, Transport, PROTO_TCP};
    use korr_core::AlertTypeKey;
    use std::net::Ipv4Addr;

    fn alert(timestamp: i64) -> Alert {
        Alert::new(
            AlertTypeKey::new(1, 1000, 1),
            3,
            timestamp,
            Ipv4Header {
                tos: 0,
                total_length: 40,
                id: 1,
                ttl: 64,
                protocol: PROTO_TCP,
                src: Ipv4Addr::new(10, 0, 0, 1),
                dst: Ipv4Addr::new(10, 0, 0, 2),
            },
            Transport::Other,
        )
    }

    #[test]
    fn drain_sorted_orders_by_non_decreasing_timestamp() {
        let buffer = AlertBuffer::new();
        buffer.push(alert(300));
        buffer.push(alert(100));
        buffer.push(alert(200));

        let snapshot = buffer.drain_sorted();
        let timestamps: Vec<i64> = snapshot.iter().map(|a| a.timestamp).collect();
        assert_eq!(timestamps, vec![100, 200, 300]);
    }

    #[test]
    fn drain_sorted_clears_the_buffer() {
        let buffer = AlertBuffer::new();
        buffer.push(alert(100));
        let _ = buffer.drain_sorted();
        assert!(buffer.drain_sorted().is_empty());
    }

    #[test]
    fn drain_sorted_is_a_deep_copy_independent_of_further_pushes() {
        let buffer = AlertBuffer::new();
        buffer.push(alert(100));
        let snapshot = buffer.drain_sorted();
        buffer.push(alert(200));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].timestamp, 100);
    }
}
