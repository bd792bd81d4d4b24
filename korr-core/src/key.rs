use std::fmt;

/// Identifies a detection-rule type: (generator id, signature id, revision).
///
/// Equality and hashing are structural over the triple, matching the C
/// `AI_alert_event_key` it replaces. This is the key into the history
/// store (C3), the bayesian cache (C5), the KB rule cache (C6) and the
/// manual-override table (C10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct AlertTypeKey {
    pub gid: u32,
    pub sid: u32,
    pub rev: u32,
}

impl AlertTypeKey {
    pub const fn new(gid: u32, sid: u32, rev: u32) -> Self {
        Self { gid, sid, rev }
    }

    /// The filename stem used to look up a knowledge-base rule file, e.g. `1-1000-1`.
    pub fn rule_file_stem(&self) -> String {
        format!("{}-{}-{}", self.gid, self.sid, self.rev)
    }
}

impl fmt::Display for AlertTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.gid, self.sid, self.rev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        assert_eq!(AlertTypeKey::new(1, 1000, 1), AlertTypeKey::new(1, 1000, 1));
        assert_ne!(AlertTypeKey::new(1, 1000, 1), AlertTypeKey::new(1, 1000, 2));
    }

    #[test]
    fn rule_file_stem_matches_gid_sid_rev() {
        assert_eq!(AlertTypeKey::new(1, 1000, 1).rule_file_stem(), "1-1000-1");
    }
}
