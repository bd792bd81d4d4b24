//! Postgres `OutputSink`, writing the `ca_ipv4_headers` / `ca_tcp_headers`
//! / `ca_alerts` / `ca_packet_streams` tables. Uses `RETURNING` to get
//! each inserted row's id back from the same statement rather than a
//! separate follow-up query.

use crate::error::OutdbError;
use crate::sink::{AlertRecord, OutputSink};
use async_trait::async_trait;
use korr_core::cluster::ClusterGeneralization;
use korr_core::headers::Transport;
use sqlx::{PgPool, Row};

pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutputSink for PostgresSink {
    async fn store_alert(&self, alert: &AlertRecord<'_>) -> Result<i64, OutdbError> {
        let db_err = |e: sqlx::Error| OutdbError::Db(e.to_string());

        let ip_hdr_id: i64 = sqlx::query(
            "INSERT INTO ca_ipv4_headers (ip_tos, ip_len, ip_id, ip_ttl, ip_proto, ip_src_addr, ip_dst_addr) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ip_hdr_id",
        )
        .bind(alert.ip.tos as i16)
        .bind(alert.ip.total_length as i32)
        .bind(alert.ip.id as i32)
        .bind(alert.ip.ttl as i16)
        .bind(alert.ip.protocol as i16)
        .bind(alert.ip.src.to_string())
        .bind(alert.ip.dst.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?
        .try_get("ip_hdr_id")
        .map_err(db_err)?;

        let tcp_hdr_id: Option<i64> = match alert.transport {
            Transport::Tcp(tcp) => Some(
                sqlx::query(
                    "INSERT INTO ca_tcp_headers (tcp_src_port, tcp_dst_port, tcp_seq, tcp_ack, tcp_flags, tcp_window, tcp_len) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING tcp_hdr_id",
                )
                .bind(tcp.src_port as i32)
                .bind(tcp.dst_port as i32)
                .bind(tcp.seq as i64)
                .bind(tcp.ack as i64)
                .bind(tcp.flags.0 as i16)
                .bind(tcp.window as i32)
                .bind(tcp.length as i32)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?
                .try_get("tcp_hdr_id")
                .map_err(db_err)?,
            ),
            _ => None,
        };

        sqlx::query(
            "INSERT INTO ca_alerts (gid, sid, rev, priority, description, classification, timestamp, ip_hdr, tcp_hdr) \
             VALUES ($1, $2, $3, $4, $5, $6, to_timestamp($7), $8, $9) RETURNING alert_id",
        )
        .bind(alert.gid as i64)
        .bind(alert.sid as i64)
        .bind(alert.rev as i64)
        .bind(alert.priority as i64)
        .bind(alert.description.unwrap_or(""))
        .bind(alert.classification.unwrap_or(""))
        .bind(alert.timestamp as f64)
        .bind(ip_hdr_id)
        .bind(tcp_hdr_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?
        .try_get("alert_id")
        .map_err(db_err)
    }

    async fn store_packet_stream(&self, alert_id: i64, payload: &[u8], timestamp: i64) -> Result<(), OutdbError> {
        sqlx::query(
            "INSERT INTO ca_packet_streams (alert_id, pkt_len, timestamp, content) \
             VALUES ($1, $2, to_timestamp($3), $4)",
        )
        .bind(alert_id)
        .bind(payload.len() as i32)
        .bind(timestamp as f64)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| OutdbError::Db(e.to_string()))?;
        Ok(())
    }

    async fn store_cluster(&self, alert_id: i64, cluster: &ClusterGeneralization) -> Result<(), OutdbError> {
        sqlx::query(
            "INSERT INTO ca_clustered_alerts (alert_id, src_port_node, dst_port_node, src_addr_node, dst_addr_node) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(alert_id)
        .bind(cluster.src_port.map(|n| n as i64))
        .bind(cluster.dst_port.map(|n| n as i64))
        .bind(cluster.src_addr.map(|n| n as i64))
        .bind(cluster.dst_addr.map(|n| n as i64))
        .execute(&self.pool)
        .await
        .map_err(|e| OutdbError::Db(e.to_string()))?;
        Ok(())
    }

    async fn store_correlation(&self, from_alert_id: i64, to_alert_id: i64, coefficient: f64) -> Result<(), OutdbError> {
        sqlx::query("INSERT INTO ca_correlated_alerts (from_alert_id, to_alert_id, coefficient) VALUES ($1, $2, $3)")
            .bind(from_alert_id)
            .bind(to_alert_id)
            .bind(coefficient)
            .execute(&self.pool)
            .await
            .map_err(|e| OutdbError::Db(e.to_string()))?;
        Ok(())
    }
}
