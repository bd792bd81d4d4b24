//! MySQL `OutputSink`, using MySQL's dialect quirks (`from_unixtime`,
//! `LAST_INSERT_ID()` in place of Postgres's `RETURNING`).

use crate::error::OutdbError;
use crate::sink::{AlertRecord, OutputSink};
use async_trait::async_trait;
use korr_core::cluster::ClusterGeneralization;
use korr_core::headers::Transport;
use sqlx::MySqlPool;

pub struct MySqlSink {
    pool: MySqlPool,
}

impl MySqlSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutputSink for MySqlSink {
    async fn store_alert(&self, alert: &AlertRecord<'_>) -> Result<i64, OutdbError> {
        let db_err = |e: sqlx::Error| OutdbError::Db(e.to_string());

        let ip_hdr_id = sqlx::query(
            "INSERT INTO ca_ipv4_headers (ip_tos, ip_len, ip_id, ip_ttl, ip_proto, ip_src_addr, ip_dst_addr) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(alert.ip.tos)
        .bind(alert.ip.total_length)
        .bind(alert.ip.id)
        .bind(alert.ip.ttl)
        .bind(alert.ip.protocol)
        .bind(alert.ip.src.to_string())
        .bind(alert.ip.dst.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .last_insert_id() as i64;

        let tcp_hdr_id: Option<i64> = match alert.transport {
            Transport::Tcp(tcp) => Some(
                sqlx::query(
                    "INSERT INTO ca_tcp_headers (tcp_src_port, tcp_dst_port, tcp_seq, tcp_ack, tcp_flags, tcp_window, tcp_len) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(tcp.src_port)
                .bind(tcp.dst_port)
                .bind(tcp.seq)
                .bind(tcp.ack)
                .bind(tcp.flags.0)
                .bind(tcp.window)
                .bind(tcp.length)
                .execute(&self.pool)
                .await
                .map_err(db_err)?
                .last_insert_id() as i64,
            ),
            _ => None,
        };

        let alert_id = sqlx::query(
            "INSERT INTO ca_alerts (gid, sid, rev, priority, description, classification, timestamp, ip_hdr, tcp_hdr) \
             VALUES (?, ?, ?, ?, ?, ?, from_unixtime(?), ?, ?)",
        )
        .bind(alert.gid)
        .bind(alert.sid)
        .bind(alert.rev)
        .bind(alert.priority)
        .bind(alert.description.unwrap_or(""))
        .bind(alert.classification.unwrap_or(""))
        .bind(alert.timestamp)
        .bind(ip_hdr_id)
        .bind(tcp_hdr_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?
        .last_insert_id() as i64;

        Ok(alert_id)
    }

    async fn store_packet_stream(&self, alert_id: i64, payload: &[u8], timestamp: i64) -> Result<(), OutdbError> {
        sqlx::query("INSERT INTO ca_packet_streams (alert_id, pkt_len, timestamp, content) VALUES (?, ?, from_unixtime(?), ?)")
            .bind(alert_id)
            .bind(payload.len() as i64)
            .bind(timestamp)
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(|e| OutdbError::Db(e.to_string()))?;
        Ok(())
    }

    async fn store_cluster(&self, alert_id: i64, cluster: &ClusterGeneralization) -> Result<(), OutdbError> {
        sqlx::query(
            "INSERT INTO ca_clustered_alerts (alert_id, src_port_node, dst_port_node, src_addr_node, dst_addr_node) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(alert_id)
        .bind(cluster.src_port)
        .bind(cluster.dst_port)
        .bind(cluster.src_addr)
        .bind(cluster.dst_addr)
        .execute(&self.pool)
        .await
        .map_err(|e| OutdbError::Db(e.to_string()))?;
        Ok(())
    }

    async fn store_correlation(&self, from_alert_id: i64, to_alert_id: i64, coefficient: f64) -> Result<(), OutdbError> {
        sqlx::query("INSERT INTO ca_correlated_alerts (from_alert_id, to_alert_id, coefficient) VALUES (?, ?, ?)")
            .bind(from_alert_id)
            .bind(to_alert_id)
            .bind(coefficient)
            .execute(&self.pool)
            .await
            .map_err(|e| OutdbError::Db(e.to_string()))?;
        Ok(())
    }
}
