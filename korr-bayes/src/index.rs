use korr_core::key::AlertTypeKey;
use korr_history::HistoryStore;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Correlation cutoff the kernel must equal at distance `T_win`, per
/// spec.md §4.5 ("a fixed cutoff y0 ≈ 10⁻³").
const CUTOFF_Y0: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: f64,
    computed_at: i64,
}

/// In-memory, history-backed bayesian correlation index (spec.md §4.5).
#[derive(Debug)]
pub struct BayesianIndex {
    cache: Mutex<HashMap<(AlertTypeKey, AlertTypeKey), CacheEntry>>,
    t_win: i64,
    cache_validity_secs: i64,
    k: f64,
}

impl BayesianIndex {
    pub fn new(t_win: i64, cache_validity_secs: i64) -> Self {
        let k = -((t_win * t_win) as f64) / CUTOFF_Y0.ln();
        Self {
            cache: Mutex::new(HashMap::new()),
            t_win,
            cache_validity_secs,
            k,
        }
    }

    fn kernel(&self, t_a: i64, t_b: i64) -> f64 {
        let delta = (t_b - t_a) as f64;
        (-(delta * delta) / self.k).exp()
    }

    /// `B(A→B)`, cached keyed by `(A,B)` with TTL `cache_validity_secs`.
    pub fn correlation(
        &self,
        a: AlertTypeKey,
        b: AlertTypeKey,
        history: &HistoryStore,
        now: i64,
    ) -> f64 {
        if let Some(entry) = self.cache.lock().get(&(a, b)) {
            if now - entry.computed_at <= self.cache_validity_secs {
                return entry.value;
            }
        }

        let value = self.compute(a, b, history);
        self.cache
            .lock()
            .insert((a, b), CacheEntry { value, computed_at: now });
        value
    }

    fn compute(&self, a: AlertTypeKey, b: AlertTypeKey, history: &HistoryStore) -> f64 {
        let Some(history_a) = history.find(&a) else {
            return 0.0;
        };
        let Some(history_b) = history.find(&b) else {
            return 0.0;
        };

        let occ_a = history_a.occurrences();
        let occ_b = history_b.occurrences();
        let n_a = occ_a.len();
        if n_a == 0 {
            return 0.0;
        }

        let mut sum_k = 0.0;
        let mut correlated_as = 0usize;

        for &t_a in occ_a {
            let mut is_correlated = false;
            for &t_b in occ_b {
                let delta = t_b - t_a;
                if (0..=self.t_win).contains(&delta) {
                    is_correlated = true;
                    sum_k += self.kernel(t_a, t_b);
                }
            }
            if is_correlated {
                correlated_as += 1;
            }
        }

        if correlated_as == 0 {
            return 0.0;
        }

        let m = correlated_as as f64;
        let corr = sum_k / m - (n_a as f64 - m) / n_a as f64;
        corr.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_history_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::load(dir.path().join("h.db")).unwrap();
        let index = BayesianIndex::new(300, 600);
        let a = AlertTypeKey::new(1, 1000, 1);
        let b = AlertTypeKey::new(1, 2000, 1);
        assert_eq!(index.correlation(a, b, &history, 0), 0.0);
    }

    #[test]
    fn perfectly_correlated_pair_reaches_near_one() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::load(dir.path().join("h.db")).unwrap();
        let a = AlertTypeKey::new(1, 1000, 1);
        let b = AlertTypeKey::new(1, 2000, 1);

        history.append(&[(a, 100), (a, 200), (a, 300)]).unwrap();
        history.append(&[(b, 100), (b, 200), (b, 300)]).unwrap();

        let index = BayesianIndex::new(300, 600);
        let corr = index.correlation(a, b, &history, 1000);
        assert!(corr > 0.9, "expected near-perfect correlation, got {corr}");
    }

    #[test]
    fn result_is_cached_within_validity_window() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::load(dir.path().join("h.db")).unwrap();
        let a = AlertTypeKey::new(1, 1000, 1);
        let b = AlertTypeKey::new(1, 2000, 1);
        history.append(&[(a, 100)]).unwrap();
        history.append(&[(b, 100)]).unwrap();

        let index = BayesianIndex::new(300, 600);
        let first = index.correlation(a, b, &history, 0);

        history.append(&[(a, 9000), (b, 9000)]).unwrap();
        let cached = index.correlation(a, b, &history, 100);
        assert_eq!(first, cached, "second call within TTL should hit cache");
    }

    #[test]
    fn result_is_clamped_to_unit_interval() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryStore::load(dir.path().join("h.db")).unwrap();
        let a = AlertTypeKey::new(1, 1000, 1);
        let b = AlertTypeKey::new(1, 2000, 1);
        history.append(&[(a, 100), (a, 9999999)]).unwrap();
        history.append(&[(b, 100)]).unwrap();

        let index = BayesianIndex::new(300, 600);
        let corr = index.correlation(a, b, &history, 0);
        assert!((0.0..=1.0).contains(&corr));
    }
}
