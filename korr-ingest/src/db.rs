//! Polled-database alert source (spec.md §4.2's second `AlertSource`),
//! using a keyset-paginated query against the `event`/`signature`/
//! `iphdr`/`tcphdr` tables, with separate MySQL and Postgres dialect
//! backends. This module only builds when the `mysql` or `postgres`
//! feature is enabled.

use crate::error::IngestError;
use crate::source::AlertBuffer;
use async_trait::async_trait;
use korr_core::headers::{Ipv4Header, Transport, TcpHeader, UdpHeader, PROTO_TCP, PROTO_UDP};
use korr_core::{flow::FlowKey, Alert, AlertTypeKey};
use korr_core::headers::TcpFlags;
use korr_stream::StreamTracker;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Keyset pagination cursor, matching `db.c`'s `latest_cid` / `latest_time`
/// pair: only rows newer than both are ever fetched again.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub last_cid: i64,
    pub last_timestamp: i64,
}

/// One denormalized row joining `event`, `signature`, `iphdr` and
/// `tcphdr`, mirroring the four queries `db.c` issues per alert.
#[derive(Debug, Clone)]
pub struct DbRow {
    pub cid: i64,
    pub timestamp: i64,
    pub gid: u32,
    pub sid: u32,
    pub rev: u32,
    pub desc: Option<String>,
    pub priority: u32,
    pub ip_tos: u8,
    pub ip_len: u16,
    pub ip_id: u16,
    pub ip_ttl: u8,
    pub ip_proto: u8,
    pub ip_src: u32,
    pub ip_dst: u32,
    pub tcp_sport: Option<u16>,
    pub tcp_dport: Option<u16>,
    pub tcp_seq: Option<u32>,
    pub tcp_ack: Option<u32>,
    pub tcp_flags: Option<u8>,
    pub tcp_win: Option<u16>,
}

impl DbRow {
    pub fn into_alert(self) -> Alert {
        let ip = Ipv4Header {
            tos: self.ip_tos,
            total_length: self.ip_len,
            id: self.ip_id,
            ttl: self.ip_ttl,
            protocol: self.ip_proto,
            src: Ipv4Addr::from(self.ip_src),
            dst: Ipv4Addr::from(self.ip_dst),
        };

        let transport = match self.ip_proto {
            PROTO_TCP if self.tcp_sport.is_some() => Transport::Tcp(TcpHeader {
                src_port: self.tcp_sport.unwrap_or(0),
                dst_port: self.tcp_dport.unwrap_or(0),
                seq: self.tcp_seq.unwrap_or(0),
                ack: self.tcp_ack.unwrap_or(0),
                flags: TcpFlags(self.tcp_flags.unwrap_or(0)),
                window: self.tcp_win.unwrap_or(0),
                length: 0,
            }),
            PROTO_UDP => Transport::Udp(UdpHeader {
                src_port: self.tcp_sport.unwrap_or(0),
                dst_port: self.tcp_dport.unwrap_or(0),
                length: self.ip_len,
            }),
            _ => Transport::Other,
        };

        let mut alert = Alert::new(AlertTypeKey::new(self.gid, self.sid, self.rev), self.priority, self.timestamp, ip, transport);
        alert.description = self.desc;
        alert
    }
}

/// Dialect-specific query execution. Implementations live behind the
/// `mysql`/`postgres` Cargo features, one per supported dialect.
#[async_trait]
pub trait DbBackend: Send + Sync {
    async fn poll_since(&self, cursor: Cursor, batch_size: i64) -> Result<Vec<DbRow>, IngestError>;
}

#[cfg(feature = "postgres")]
pub mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub struct PostgresBackend {
        pool: PgPool,
    }

    impl PostgresBackend {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl DbBackend for PostgresBackend {
        async fn poll_since(&self, cursor: Cursor, batch_size: i64) -> Result<Vec<DbRow>, IngestError> {
            let rows = sqlx::query(
                "SELECT e.cid AS cid, \
                        EXTRACT(EPOCH FROM e.timestamp)::BIGINT AS ts, \
                        COALESCE(s.sig_gid, 0) AS gid, COALESCE(s.sig_sid, 0) AS sid, COALESCE(s.sig_rev, 0) AS rev, \
                        s.sig_name AS desc, COALESCE(s.sig_priority, 0) AS priority, \
                        COALESCE(i.ip_tos, 0) AS ip_tos, COALESCE(i.ip_len, 0) AS ip_len, COALESCE(i.ip_id, 0) AS ip_id, \
                        COALESCE(i.ip_ttl, 0) AS ip_ttl, COALESCE(i.ip_proto, 0) AS ip_proto, \
                        COALESCE(i.ip_src, 0) AS ip_src, COALESCE(i.ip_dst, 0) AS ip_dst, \
                        t.tcp_sport AS tcp_sport, t.tcp_dport AS tcp_dport, t.tcp_seq AS tcp_seq, \
                        t.tcp_ack AS tcp_ack, t.tcp_flags AS tcp_flags, t.tcp_win AS tcp_win \
                 FROM event e \
                 LEFT JOIN signature s ON s.sig_id = e.signature \
                 LEFT JOIN iphdr i ON i.cid = e.cid \
                 LEFT JOIN tcphdr t ON t.cid = e.cid \
                 WHERE e.cid > $1 AND EXTRACT(EPOCH FROM e.timestamp) > $2 \
                 ORDER BY e.cid LIMIT $3",
            )
            .bind(cursor.last_cid)
            .bind(cursor.last_timestamp)
            .bind(batch_size)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| IngestError::Db(source.to_string()))?;

            rows.into_iter()
                .map(|row| {
                    Ok(DbRow {
                        cid: row.try_get("cid").map_err(|e| IngestError::Db(e.to_string()))?,
                        timestamp: row.try_get("ts").map_err(|e| IngestError::Db(e.to_string()))?,
                        gid: row.try_get::<i64, _>("gid").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        sid: row.try_get::<i64, _>("sid").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        rev: row.try_get::<i64, _>("rev").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        desc: row.try_get("desc").ok(),
                        priority: row.try_get::<i64, _>("priority").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        ip_tos: row.try_get::<i32, _>("ip_tos").map_err(|e| IngestError::Db(e.to_string()))? as u8,
                        ip_len: row.try_get::<i32, _>("ip_len").map_err(|e| IngestError::Db(e.to_string()))? as u16,
                        ip_id: row.try_get::<i32, _>("ip_id").map_err(|e| IngestError::Db(e.to_string()))? as u16,
                        ip_ttl: row.try_get::<i32, _>("ip_ttl").map_err(|e| IngestError::Db(e.to_string()))? as u8,
                        ip_proto: row.try_get::<i32, _>("ip_proto").map_err(|e| IngestError::Db(e.to_string()))? as u8,
                        ip_src: row.try_get::<i64, _>("ip_src").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        ip_dst: row.try_get::<i64, _>("ip_dst").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        tcp_sport: row.try_get::<Option<i32>, _>("tcp_sport").unwrap_or(None).map(|v| v as u16),
                        tcp_dport: row.try_get::<Option<i32>, _>("tcp_dport").unwrap_or(None).map(|v| v as u16),
                        tcp_seq: row.try_get::<Option<i64>, _>("tcp_seq").unwrap_or(None).map(|v| v as u32),
                        tcp_ack: row.try_get::<Option<i64>, _>("tcp_ack").unwrap_or(None).map(|v| v as u32),
                        tcp_flags: row.try_get::<Option<i32>, _>("tcp_flags").unwrap_or(None).map(|v| v as u8),
                        tcp_win: row.try_get::<Option<i32>, _>("tcp_win").unwrap_or(None).map(|v| v as u16),
                    })
                })
                .collect()
        }
    }
}

#[cfg(feature = "mysql")]
pub mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    pub struct MySqlBackend {
        pool: MySqlPool,
    }

    impl MySqlBackend {
        pub fn new(pool: MySqlPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl DbBackend for MySqlBackend {
        async fn poll_since(&self, cursor: Cursor, batch_size: i64) -> Result<Vec<DbRow>, IngestError> {
            let rows = sqlx::query(
                "SELECT e.cid AS cid, UNIX_TIMESTAMP(e.timestamp) AS ts, \
                        COALESCE(s.sig_gid, 0) AS gid, COALESCE(s.sig_sid, 0) AS sid, COALESCE(s.sig_rev, 0) AS rev, \
                        s.sig_name AS `desc`, COALESCE(s.sig_priority, 0) AS priority, \
                        COALESCE(i.ip_tos, 0) AS ip_tos, COALESCE(i.ip_len, 0) AS ip_len, COALESCE(i.ip_id, 0) AS ip_id, \
                        COALESCE(i.ip_ttl, 0) AS ip_ttl, COALESCE(i.ip_proto, 0) AS ip_proto, \
                        COALESCE(i.ip_src, 0) AS ip_src, COALESCE(i.ip_dst, 0) AS ip_dst, \
                        t.tcp_sport AS tcp_sport, t.tcp_dport AS tcp_dport, t.tcp_seq AS tcp_seq, \
                        t.tcp_ack AS tcp_ack, t.tcp_flags AS tcp_flags, t.tcp_win AS tcp_win \
                 FROM event e \
                 LEFT JOIN signature s ON s.sig_id = e.signature \
                 LEFT JOIN iphdr i ON i.cid = e.cid \
                 LEFT JOIN tcphdr t ON t.cid = e.cid \
                 WHERE e.cid > ? AND UNIX_TIMESTAMP(e.timestamp) > ? \
                 ORDER BY e.cid LIMIT ?",
            )
            .bind(cursor.last_cid)
            .bind(cursor.last_timestamp)
            .bind(batch_size)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| IngestError::Db(source.to_string()))?;

            rows.into_iter()
                .map(|row| {
                    Ok(DbRow {
                        cid: row.try_get("cid").map_err(|e| IngestError::Db(e.to_string()))?,
                        timestamp: row.try_get("ts").map_err(|e| IngestError::Db(e.to_string()))?,
                        gid: row.try_get::<u64, _>("gid").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        sid: row.try_get::<u64, _>("sid").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        rev: row.try_get::<u64, _>("rev").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        desc: row.try_get("desc").ok(),
                        priority: row.try_get::<u64, _>("priority").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        ip_tos: row.try_get::<u64, _>("ip_tos").map_err(|e| IngestError::Db(e.to_string()))? as u8,
                        ip_len: row.try_get::<u64, _>("ip_len").map_err(|e| IngestError::Db(e.to_string()))? as u16,
                        ip_id: row.try_get::<u64, _>("ip_id").map_err(|e| IngestError::Db(e.to_string()))? as u16,
                        ip_ttl: row.try_get::<u64, _>("ip_ttl").map_err(|e| IngestError::Db(e.to_string()))? as u8,
                        ip_proto: row.try_get::<u64, _>("ip_proto").map_err(|e| IngestError::Db(e.to_string()))? as u8,
                        ip_src: row.try_get::<u64, _>("ip_src").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        ip_dst: row.try_get::<u64, _>("ip_dst").map_err(|e| IngestError::Db(e.to_string()))? as u32,
                        tcp_sport: row.try_get::<Option<u64>, _>("tcp_sport").unwrap_or(None).map(|v| v as u16),
                        tcp_dport: row.try_get::<Option<u64>, _>("tcp_dport").unwrap_or(None).map(|v| v as u16),
                        tcp_seq: row.try_get::<Option<u64>, _>("tcp_seq").unwrap_or(None).map(|v| v as u32),
                        tcp_ack: row.try_get::<Option<u64>, _>("tcp_ack").unwrap_or(None).map(|v| v as u32),
                        tcp_flags: row.try_get::<Option<u64>, _>("tcp_flags").unwrap_or(None).map(|v| v as u8),
                        tcp_win: row.try_get::<Option<u64>, _>("tcp_win").unwrap_or(None).map(|v| v as u16),
                    })
                })
                .collect()
        }
    }
}

/// Async counterpart to [`crate::AlertSource`]: polling a database
/// cannot be done synchronously over `sqlx`, so this has its own
/// `poll`/`list` pair with the same deep-copy-snapshot contract.
pub struct DbPollSource<B> {
    backend: B,
    tracker: Option<Arc<StreamTracker>>,
    buffer: AlertBuffer,
    cursor: Mutex<Cursor>,
    batch_size: i64,
}

impl<B: DbBackend> DbPollSource<B> {
    pub fn new(backend: B, start_time: i64, batch_size: i64, tracker: Option<Arc<StreamTracker>>) -> Self {
        Self {
            backend,
            tracker,
            buffer: AlertBuffer::new(),
            cursor: Mutex::new(Cursor {
                last_cid: 0,
                last_timestamp: start_time,
            }),
            batch_size,
        }
    }

    fn attach_flow(&self, alert: &mut Alert) {
        let Some(tracker) = &self.tracker else { return };
        if !alert.is_tcp() {
            return;
        }
        let Some(dst_port) = alert.dst_port() else { return };
        let key = FlowKey::new(alert.ip.src, dst_port);
        if tracker.lookup(&key).is_some() {
            tracker.mark_observed(&key);
            alert.flow = Some(key);
        }
    }

    /// Query for rows newer than the current cursor, advance the cursor
    /// past them, and buffer the resulting alerts.
    pub async fn poll(&self, now: i64) -> Result<usize, IngestError> {
        let mut cursor = self.cursor.lock().await;
        let rows = self.backend.poll_since(*cursor, self.batch_size).await?;
        if rows.is_empty() {
            return Ok(0);
        }

        for row in &rows {
            cursor.last_cid = cursor.last_cid.max(row.cid);
        }
        cursor.last_timestamp = now;

        let count = rows.len();
        for row in rows {
            let mut alert = row.into_alert();
            self.attach_flow(&mut alert);
            self.buffer.push(alert);
        }
        Ok(count)
    }

    pub fn list(&self) -> Vec<Alert> {
        self.buffer.drain_sorted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubBackend {
        rows: std::sync::Mutex<Vec<DbRow>>,
    }

    #[async_trait]
    impl DbBackend for StubBackend {
        async fn poll_since(&self, cursor: Cursor, _batch_size: i64) -> Result<Vec<DbRow>, IngestError> {
            let mut rows = self.rows.lock().unwrap();
            let (matching, rest): (Vec<_>, Vec<_>) = rows.drain(..).partition(|r| r.cid > cursor.last_cid);
            *rows = rest;
            Ok(matching)
        }
    }

    fn stub_row(cid: i64, timestamp: i64) -> DbRow {
        DbRow {
            cid,
            timestamp,
            gid: 1,
            sid: 1000,
            rev: 1,
            desc: None,
            priority: 3,
            ip_tos: 0,
            ip_len: 40,
            ip_id: 1,
            ip_ttl: 64,
            ip_proto: PROTO_TCP,
            ip_src: u32::from(Ipv4Addr::new(10, 0, 0, 1)),
            ip_dst: u32::from(Ipv4Addr::new(10, 0, 0, 2)),
            tcp_sport: Some(4444),
            tcp_dport: Some(80),
            tcp_seq: Some(1),
            tcp_ack: Some(0),
            tcp_flags: Some(0x02),
            tcp_win: Some(8192),
        }
    }

    #[tokio::test]
    async fn advances_the_cursor_past_the_highest_cid_seen() {
        let backend = StubBackend {
            rows: std::sync::Mutex::new(vec![stub_row(1, 100), stub_row(2, 101)]),
        };
        let source = DbPollSource::new(backend, 0, 100, None);
        let produced = source.poll(200).await.unwrap();
        assert_eq!(produced, 2);
        assert_eq!(source.list().len(), 2);
        assert_eq!(source.poll(200).await.unwrap(), 0);
    }

    #[test]
    fn into_alert_maps_tcp_fields() {
        let alert = stub_row(1, 100).into_alert();
        assert!(alert.is_tcp());
        assert_eq!(alert.src_port(), Some(4444));
        assert_eq!(alert.ip.src, Ipv4Addr::new(10, 0, 0, 1));
    }
}
