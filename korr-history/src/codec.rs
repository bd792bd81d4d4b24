use crate::error::HistoryError;
use korr_core::key::AlertTypeKey;
use std::io::{Read, Write};

/// Bit-exact binary codec for the history file (spec.md §4.3). Native
/// byte order, hand-rolled rather than `bincode`, since the layout pins
/// a fixed C-compatible record shape `bincode`'s own framing wouldn't
/// reproduce.
pub fn read_key_and_timestamp<R: Read>(
    reader: &mut R,
    path: &str,
) -> Result<(AlertTypeKey, i64), HistoryError> {
    let mut gid_buf = [0u8; 4];
    let mut sid_buf = [0u8; 4];
    let mut rev_buf = [0u8; 4];
    let mut ts_buf = [0u8; 8];

    reader.read_exact(&mut gid_buf).map_err(|source| io_err(path, source))?;
    reader.read_exact(&mut sid_buf).map_err(|source| io_err(path, source))?;
    reader.read_exact(&mut rev_buf).map_err(|source| io_err(path, source))?;
    reader.read_exact(&mut ts_buf).map_err(|source| io_err(path, source))?;

    let key = AlertTypeKey::new(
        u32::from_ne_bytes(gid_buf),
        u32::from_ne_bytes(sid_buf),
        u32::from_ne_bytes(rev_buf),
    );
    let timestamp = i64::from_ne_bytes(ts_buf);
    Ok((key, timestamp))
}

pub fn write_key_and_timestamp<W: Write>(
    writer: &mut W,
    key: AlertTypeKey,
    timestamp: i64,
) -> std::io::Result<()> {
    writer.write_all(&key.gid.to_ne_bytes())?;
    writer.write_all(&key.sid.to_ne_bytes())?;
    writer.write_all(&key.rev.to_ne_bytes())?;
    writer.write_all(&timestamp.to_ne_bytes())?;
    Ok(())
}

pub fn read_u32<R: Read>(reader: &mut R, path: &str) -> Result<u32, HistoryError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(|source| io_err(path, source))?;
    Ok(u32::from_ne_bytes(buf))
}

fn io_err(path: &str, source: std::io::Error) -> HistoryError {
    if source.kind() == std::io::ErrorKind::UnexpectedEof {
        HistoryError::Malformed {
            path: path.to_string(),
            reason: "unexpected end of file".to_string(),
        }
    } else {
        HistoryError::Io {
            path: path.to_string(),
            source,
        }
    }
}
