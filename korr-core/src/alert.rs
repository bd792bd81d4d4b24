use crate::cluster::ClusterGeneralization;
use crate::flow::FlowKey;
use crate::headers::{Ipv4Header, Transport};
use crate::hyperalert::HyperAlertBinding;
use crate::key::AlertTypeKey;

/// A single normalized detection record, produced by the ingestor (C2)
/// and enriched in place (never replaced) by the clustering and
/// knowledge-base stages. See spec.md §3.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Alert {
    pub type_key: AlertTypeKey,
    pub priority: u32,
    pub description: Option<String>,
    pub classification: Option<String>,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub ip: Ipv4Header,
    pub transport: Transport,
    /// Back-reference into the Stream Tracker; a lookup key, not an
    /// owning pointer (design note in spec.md §9).
    pub flow: Option<FlowKey>,
    pub hyperalert: Option<HyperAlertBinding>,
    pub cluster: ClusterGeneralization,
    /// Number of alerts collapsed into this representative by C4; always >= 1.
    pub grouped_count: u32,
    /// Raw packet payload, when the ingestion source captured one (text
    /// tailer payload line or a flow snapshot); used only by the output
    /// serializer's `packet_streams` table.
    pub payload: Vec<u8>,
    /// Set once this alert round-trips through the output database.
    pub db_id: Option<i64>,
}

impl Alert {
    /// Construct a freshly-ingested alert: no clustering/hyperalert
    /// enrichment yet, multiplicity of one.
    pub fn new(
        type_key: AlertTypeKey,
        priority: u32,
        timestamp: i64,
        ip: Ipv4Header,
        transport: Transport,
    ) -> Self {
        Self {
            type_key,
            priority,
            description: None,
            classification: None,
            timestamp,
            ip,
            transport,
            flow: None,
            hyperalert: None,
            cluster: ClusterGeneralization::default(),
            grouped_count: 1,
            payload: Vec::new(),
            db_id: None,
        }
    }

    pub fn src_port(&self) -> Option<u16> {
        self.transport.src_port()
    }

    pub fn dst_port(&self) -> Option<u16> {
        self.transport.dst_port()
    }

    pub fn is_tcp(&self) -> bool {
        self.transport.is_tcp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::PROTO_TCP;
    use std::net::Ipv4Addr;

    fn sample_ip() -> Ipv4Header {
        Ipv4Header {
            tos: 0,
            total_length: 40,
            id: 1,
            ttl: 64,
            protocol: PROTO_TCP,
            src: Ipv4Addr::new(10, 0, 0, 1),
            dst: Ipv4Addr::new(10, 0, 0, 2),
        }
    }

    #[test]
    fn new_alert_has_multiplicity_one_and_no_enrichment() {
        let a = Alert::new(
            AlertTypeKey::new(1, 1000, 1),
            3,
            100,
            sample_ip(),
            crate::headers::Transport::Other,
        );
        assert_eq!(a.grouped_count, 1);
        assert!(a.hyperalert.is_none());
        assert!(a.flow.is_none());
    }

    #[test]
    fn serde_round_trips() {
        let a = Alert::new(
            AlertTypeKey::new(1, 1000, 1),
            3,
            100,
            sample_ip(),
            crate::headers::Transport::Other,
        );
        let json = serde_json::to_string(&a).unwrap();
        let back: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(back.type_key, a.type_key);
        assert_eq!(back.timestamp, a.timestamp);
    }
}
