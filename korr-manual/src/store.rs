use crate::error::ManualError;
use crate::pair::{parse_pairs_xml, ManualPair};
use arc_swap::ArcSwap;
use korr_core::AlertTypeKey;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The outcome of looking up a pair in the manual override store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    ForceCorrelate,
    ForceUncorrelate,
}

#[derive(Debug, Default)]
struct Snapshot {
    correlate: HashSet<(AlertTypeKey, AlertTypeKey)>,
    uncorrelate: HashSet<(AlertTypeKey, AlertTypeKey)>,
}

/// Lock-free holder of the two manual-override directive sets, swapped
/// atomically at the end of each parse period (spec.md §4.10). Readers on
/// the correlation engine's hot path never block a concurrent reload.
pub struct ManualStore {
    correlate_path: PathBuf,
    uncorrelate_path: PathBuf,
    snapshot: ArcSwap<Snapshot>,
}

impl ManualStore {
    pub fn new(correlate_path: PathBuf, uncorrelate_path: PathBuf) -> Self {
        Self {
            correlate_path,
            uncorrelate_path,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    fn read_pairs(path: &Path) -> Result<Vec<ManualPair>, ManualError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let path_str = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ManualError::Io {
            path: path_str.clone(),
            source,
        })?;
        parse_pairs_xml(&content, &path_str)
    }

    /// Reparse both files and atomically replace the snapshot. A parse
    /// failure on either file is non-fatal: it's logged and the previous
    /// snapshot remains in effect (spec.md §7).
    pub fn reload(&self) {
        let correlate = Self::read_pairs(&self.correlate_path);
        let uncorrelate = Self::read_pairs(&self.uncorrelate_path);

        match (correlate, uncorrelate) {
            (Ok(correlate), Ok(uncorrelate)) => {
                let next = Snapshot {
                    correlate: correlate.into_iter().map(|p| (p.from, p.to)).collect(),
                    uncorrelate: uncorrelate.into_iter().map(|p| (p.from, p.to)).collect(),
                };
                self.snapshot.store(Arc::new(next));
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "manual override reload failed, keeping previous snapshot");
            }
        }
    }

    /// The directive, if any, governing the directed pair `(from, to)`.
    /// Force-uncorrelate and force-correlate for the same pair cannot both
    /// be present after a reload (the files are mutually exclusive inputs);
    /// if they somehow are, uncorrelate wins.
    pub fn lookup(&self, from: AlertTypeKey, to: AlertTypeKey) -> Option<Verdict> {
        let snapshot = self.snapshot.load();
        let key = (from, to);
        if snapshot.uncorrelate.contains(&key) {
            Some(Verdict::ForceUncorrelate)
        } else if snapshot.correlate.contains(&key) {
            Some(Verdict::ForceCorrelate)
        } else {
            None
        }
    }
}

/// Apply a manual-override verdict to a computed coefficient, per spec.md
/// §8 invariant 7: force-uncorrelate suppresses the edge entirely;
/// force-correlate floors the coefficient at `threshold`; absent any
/// override, the edge is emitted only when `computed` already clears
/// `threshold`.
pub fn resolve_override(verdict: Option<Verdict>, computed: f64, threshold: f64) -> Option<f64> {
    match verdict {
        Some(Verdict::ForceUncorrelate) => None,
        Some(Verdict::ForceCorrelate) => Some(computed.max(threshold)),
        None => {
            if computed >= threshold {
                Some(computed)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn reload_populates_lookup_from_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let correlate_path = dir.path().join("manual_correlations.xml");
        let uncorrelate_path = dir.path().join("manual_uncorrelations.xml");
        write(
            &correlate_path,
            r#"<correlations><correlation>
                <from gid="1" sid="1000" rev="1"/>
                <to gid="1" sid="1001" rev="1"/>
            </correlation></correlations>"#,
        );
        write(
            &uncorrelate_path,
            r#"<correlations><correlation>
                <from gid="1" sid="2000" rev="1"/>
                <to gid="1" sid="2001" rev="1"/>
            </correlation></correlations>"#,
        );

        let store = ManualStore::new(correlate_path, uncorrelate_path);
        store.reload();

        assert_eq!(
            store.lookup(AlertTypeKey::new(1, 1000, 1), AlertTypeKey::new(1, 1001, 1)),
            Some(Verdict::ForceCorrelate)
        );
        assert_eq!(
            store.lookup(AlertTypeKey::new(1, 2000, 1), AlertTypeKey::new(1, 2001, 1)),
            Some(Verdict::ForceUncorrelate)
        );
        assert_eq!(store.lookup(AlertTypeKey::new(9, 9, 9), AlertTypeKey::new(9, 9, 9)), None);
    }

    #[test]
    fn malformed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let correlate_path = dir.path().join("manual_correlations.xml");
        let uncorrelate_path = dir.path().join("manual_uncorrelations.xml");
        write(
            &correlate_path,
            r#"<correlations><correlation>
                <from gid="1" sid="1000" rev="1"/>
                <to gid="1" sid="1001" rev="1"/>
            </correlation></correlations>"#,
        );
        write(&uncorrelate_path, "<correlations></correlations>");

        let store = ManualStore::new(correlate_path.clone(), uncorrelate_path);
        store.reload();
        assert!(store
            .lookup(AlertTypeKey::new(1, 1000, 1), AlertTypeKey::new(1, 1001, 1))
            .is_some());

        write(&correlate_path, "<not-xml");
        store.reload();
        assert_eq!(
            store.lookup(AlertTypeKey::new(1, 1000, 1), AlertTypeKey::new(1, 1001, 1)),
            Some(Verdict::ForceCorrelate)
        );
    }

    #[test]
    fn missing_files_yield_empty_store() {
        let store = ManualStore::new(
            PathBuf::from("/nonexistent/manual_correlations.xml"),
            PathBuf::from("/nonexistent/manual_uncorrelations.xml"),
        );
        store.reload();
        assert_eq!(store.lookup(AlertTypeKey::new(1, 1, 1), AlertTypeKey::new(1, 1, 1)), None);
    }

    #[test]
    fn resolve_override_matches_dominance_scenario() {
        assert_eq!(resolve_override(None, 0.2, 0.5), None);
        assert_eq!(resolve_override(Some(Verdict::ForceCorrelate), 0.2, 0.5), Some(0.5));
        assert_eq!(resolve_override(Some(Verdict::ForceUncorrelate), 0.9, 0.5), None);
    }
}
