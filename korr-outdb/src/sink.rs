use crate::error::OutdbError;
use async_trait::async_trait;
use korr_core::cluster::ClusterGeneralization;

/// Writes one piece of the output schema at a time, across the
/// `ca_ipv4_headers` / `ca_tcp_headers` / `ca_alerts` / `ca_packet_streams`
/// / `ca_clustered_alerts` / `ca_correlated_alerts` tables. Split this
/// finely (rather than one "store everything" call) so a failure partway
/// through a record can be logged and skipped without losing the rest of
/// the batch.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Insert the alert's IP/TCP headers and the alert row itself, and
    /// return the new `ca_alerts.alert_id`.
    async fn store_alert(&self, alert: &AlertRecord) -> Result<i64, OutdbError>;

    /// Insert one captured packet belonging to `alert_id`'s flow.
    async fn store_packet_stream(&self, alert_id: i64, payload: &[u8], timestamp: i64) -> Result<(), OutdbError>;

    /// Record `alert_id`'s cluster generalization pointers.
    async fn store_cluster(&self, alert_id: i64, cluster: &ClusterGeneralization) -> Result<(), OutdbError>;

    /// Record a directed correlation edge between two already-persisted alerts.
    async fn store_correlation(&self, from_alert_id: i64, to_alert_id: i64, coefficient: f64) -> Result<(), OutdbError>;
}

/// The subset of an [`korr_core::Alert`] the output schema's `ca_alerts`
/// row (plus its `ca_ipv4_headers`/`ca_tcp_headers` parents) needs. Kept
/// separate from `Alert` itself so sinks don't need to know about
/// in-memory-only fields like `flow`, `hyperalert` or `db_id`.
#[derive(Debug, Clone, Copy)]
pub struct AlertRecord<'a> {
    pub gid: u32,
    pub sid: u32,
    pub rev: u32,
    pub priority: u32,
    pub description: Option<&'a str>,
    pub classification: Option<&'a str>,
    pub timestamp: i64,
    pub ip: &'a korr_core::headers::Ipv4Header,
    pub transport: &'a korr_core::headers::Transport,
}

impl<'a> From<&'a korr_core::Alert> for AlertRecord<'a> {
    fn from(alert: &'a korr_core::Alert) -> Self {
        Self {
            gid: alert.type_key.gid,
            sid: alert.type_key.sid,
            rev: alert.type_key.rev,
            priority: alert.priority,
            description: alert.description.as_deref(),
            classification: alert.classification.as_deref(),
            timestamp: alert.timestamp,
            ip: &alert.ip,
            transport: &alert.transport,
        }
    }
}
