use crate::error::OutdbError;
use crate::sink::{AlertRecord, OutputSink};
use korr_core::Alert;

/// A directed correlation edge between two alerts in the same batch,
/// identified by index into the `alerts` slice passed to [`persist_batch`].
/// Mirrors `korr_engine::CorrelationEdge`'s shape without requiring this
/// crate to depend on the engine crate.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub coefficient: f64,
}

/// How many records in a batch persisted cleanly versus were skipped
/// after a per-record error, per spec.md §4.11's "a DB error on one
/// record aborts that record only" invariant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub alerts_stored: usize,
    pub alerts_failed: usize,
    pub packets_failed: usize,
    pub clusters_failed: usize,
    pub edges_stored: usize,
    pub edges_failed: usize,
}

/// Persist every alert in `alerts` (setting `db_id` on success), then
/// every correlation edge in `edges` whose endpoints both persisted.
/// Each insert is its own query; a failure is logged with `tracing::warn!`
/// and the batch continues, never wrapped in one all-or-nothing transaction.
pub async fn persist_batch(sink: &dyn OutputSink, alerts: &mut [Alert], edges: &[Edge]) -> PersistReport {
    let mut report = PersistReport::default();

    for alert in alerts.iter_mut() {
        let record = AlertRecord::from(&*alert);
        match sink.store_alert(&record).await {
            Ok(alert_id) => {
                alert.db_id = Some(alert_id);
                report.alerts_stored += 1;

                if !alert.payload.is_empty() {
                    if let Err(err) = sink.store_packet_stream(alert_id, &alert.payload, alert.timestamp).await {
                        tracing::warn!(alert_id, error = %err, "failed to store packet stream, skipping");
                        report.packets_failed += 1;
                    }
                }

                if alert.cluster != Default::default() {
                    if let Err(err) = sink.store_cluster(alert_id, &alert.cluster).await {
                        tracing::warn!(alert_id, error = %err, "failed to store cluster generalization, skipping");
                        report.clusters_failed += 1;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(gid = alert.type_key.gid, sid = alert.type_key.sid, error = %err, "failed to store alert, skipping");
                report.alerts_failed += 1;
            }
        }
    }

    for edge in edges {
        let (Some(from_id), Some(to_id)) = (
            alerts.get(edge.from).and_then(|a| a.db_id),
            alerts.get(edge.to).and_then(|a| a.db_id),
        ) else {
            report.edges_failed += 1;
            continue;
        };

        match sink.store_correlation(from_id, to_id, edge.coefficient).await {
            Ok(()) => report.edges_stored += 1,
            Err(err) => {
                tracing::warn!(from_id, to_id, error = %err, "failed to store correlation edge, skipping");
                report.edges_failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use korr_core::headers::{Ipv4Header, Transport, PROTO_TCP};
    use korr_core::AlertTypeKey;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

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

    struct StubSink {
        next_id: AtomicI64,
        fail_sid: u32,
        correlations: Mutex<Vec<(i64, i64, f64)>>,
    }

    #[async_trait::async_trait]
    impl OutputSink for StubSink {
        async fn store_alert(&self, alert: &AlertRecord<'_>) -> Result<i64, OutdbError> {
            if alert.sid == self.fail_sid {
                return Err(OutdbError::Db("simulated failure".into()));
            }
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        async fn store_packet_stream(&self, _alert_id: i64, _payload: &[u8], _timestamp: i64) -> Result<(), OutdbError> {
            Ok(())
        }

        async fn store_cluster(&self, _alert_id: i64, _cluster: &korr_core::cluster::ClusterGeneralization) -> Result<(), OutdbError> {
            Ok(())
        }

        async fn store_correlation(&self, from_alert_id: i64, to_alert_id: i64, coefficient: f64) -> Result<(), OutdbError> {
            self.correlations.lock().unwrap().push((from_alert_id, to_alert_id, coefficient));
            Ok(())
        }
    }

    #[tokio::test]
    async fn a_failed_alert_insert_does_not_abort_the_rest_of_the_batch() {
        let sink = StubSink {
            next_id: AtomicI64::new(1),
            fail_sid: 2000,
            correlations: Mutex::new(Vec::new()),
        };

        let mut alerts = vec![
            Alert::new(AlertTypeKey::new(1, 1000, 1), 3, 100, sample_ip(), Transport::Other),
            Alert::new(AlertTypeKey::new(1, 2000, 1), 3, 101, sample_ip(), Transport::Other),
            Alert::new(AlertTypeKey::new(1, 3000, 1), 3, 102, sample_ip(), Transport::Other),
        ];

        let report = persist_batch(&sink, &mut alerts, &[]).await;
        assert_eq!(report.alerts_stored, 2);
        assert_eq!(report.alerts_failed, 1);
        assert_eq!(alerts[0].db_id, Some(1));
        assert_eq!(alerts[1].db_id, None);
        assert_eq!(alerts[2].db_id, Some(2));
    }

    #[tokio::test]
    async fn an_edge_whose_endpoint_failed_to_persist_is_skipped() {
        let sink = StubSink {
            next_id: AtomicI64::new(1),
            fail_sid: 2000,
            correlations: Mutex::new(Vec::new()),
        };

        let mut alerts = vec![
            Alert::new(AlertTypeKey::new(1, 1000, 1), 3, 100, sample_ip(), Transport::Other),
            Alert::new(AlertTypeKey::new(1, 2000, 1), 3, 101, sample_ip(), Transport::Other),
        ];
        let edges = vec![Edge {
            from: 0,
            to: 1,
            coefficient: 0.9,
        }];

        let report = persist_batch(&sink, &mut alerts, &edges).await;
        assert_eq!(report.edges_stored, 0);
        assert_eq!(report.edges_failed, 1);
        assert!(sink.correlations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_surviving_edge_is_stored_with_both_persisted_alert_ids() {
        let sink = StubSink {
            next_id: AtomicI64::new(1),
            fail_sid: 0,
            correlations: Mutex::new(Vec::new()),
        };

        let mut alerts = vec![
            Alert::new(AlertTypeKey::new(1, 1000, 1), 3, 100, sample_ip(), Transport::Other),
            Alert::new(AlertTypeKey::new(1, 2000, 1), 3, 101, sample_ip(), Transport::Other),
        ];
        let edges = vec![Edge {
            from: 0,
            to: 1,
            coefficient: 0.75,
        }];

        let report = persist_batch(&sink, &mut alerts, &edges).await;
        assert_eq!(report.edges_stored, 1);
        assert_eq!(sink.correlations.lock().unwrap()[0], (1, 2, 0.75));
    }
}
