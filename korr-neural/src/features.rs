use korr_core::Alert;

/// Number of normalized features the SOM trains and infers over (spec.md §4.8).
pub const FEATURES: usize = 6;

/// Project an alert onto the six normalized features the SOM operates over.
///
/// `gid`/`sid` are packed into a single 32-bit value (`gid << 16 | sid`),
/// then every component is scaled by its namespace's maximum so all six
/// features land in `[0, 1]`.
pub fn features(alert: &Alert) -> [f64; FEATURES] {
    let packed = alert.type_key.gid.wrapping_shl(16) | (alert.type_key.sid & 0xFFFF);
    [
        packed as f64 / u32::MAX as f64,
        alert.timestamp as f64 / i32::MAX as f64,
        u32::from(alert.ip.src) as f64 / u32::MAX as f64,
        u32::from(alert.ip.dst) as f64 / u32::MAX as f64,
        alert.src_port().unwrap_or(0) as f64 / u16::MAX as f64,
        alert.dst_port().unwrap_or(0) as f64 / u16::MAX as f64,
    ]
}
