use korr_core::Alert;

/// `repr(C)` projection of the fields an external correlation plugin can
/// see, passed to native/scripted plugins by pointer so their ABI never
/// depends on the full `Alert` type's layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PluginAlertView {
    pub gid: u32,
    pub sid: u32,
    pub rev: u32,
    pub timestamp: i64,
    pub src_addr: u32,
    pub dst_addr: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub priority: u32,
    pub grouped_count: u32,
}

impl From<&Alert> for PluginAlertView {
    fn from(alert: &Alert) -> Self {
        Self {
            gid: alert.type_key.gid,
            sid: alert.type_key.sid,
            rev: alert.type_key.rev,
            timestamp: alert.timestamp,
            src_addr: u32::from(alert.ip.src),
            dst_addr: u32::from(alert.ip.dst),
            src_port: alert.src_port().unwrap_or(0),
            dst_port: alert.dst_port().unwrap_or(0),
            priority: alert.priority,
            grouped_count: alert.grouped_count,
        }
    }
}
