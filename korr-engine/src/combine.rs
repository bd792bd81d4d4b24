use crate::error::EngineError;
use crate::weights::Weights;
use korr_bayes::BayesianIndex;
use korr_core::Alert;
use korr_history::HistoryStore;
use korr_kb::KbIndex;
use korr_manual::{resolve_override, ManualStore};
use korr_plugin::{PluginAlertView, PluginIndex};

/// A directed correlation between two alerts in the phase's window,
/// identified by their index into the snapshot slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationEdge {
    pub from: usize,
    pub to: usize,
    pub coefficient: f64,
}

/// `C(a,b)` for one ordered pair, per spec.md §4.9's weighted-sum formula.
fn combine(
    weights: &Weights,
    bayes_score: f64,
    kb_score: f64,
    plugin_contributions: &[(f64, f64)],
) -> f64 {
    let mut numerator = weights.bayes * bayes_score + weights.kb * kb_score + weights.baseline * Weights::BASELINE_SCORE;
    let mut denominator = weights.bayes + weights.kb + weights.baseline;

    for &(score, weight) in plugin_contributions {
        numerator += weight * score;
        denominator += weight;
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

/// Enrich every alert in `snapshot` lacking a hyperalert binding, using
/// the knowledge-base rule cache (spec.md §4.9's "enrich" stage). Mutates
/// in place; a malformed rule file is fatal and propagates.
pub fn enrich(snapshot: &mut [Alert], kb: &KbIndex) -> Result<(), EngineError> {
    for alert in snapshot.iter_mut() {
        if alert.hyperalert.is_none() {
            alert.hyperalert = kb.bind_alert(alert)?;
        }
    }
    Ok(())
}

/// Score every ordered pair of distinct alerts in `snapshot`, threshold
/// the resulting distribution, and emit the directed edges that survive
/// manual-override resolution (spec.md §4.9, §8 invariant 7).
///
/// `snapshot` is assumed already enriched (see [`enrich`]).
#[allow(clippy::too_many_arguments)]
pub fn score_and_threshold(
    snapshot: &[Alert],
    bayes: &BayesianIndex,
    kb: &KbIndex,
    plugins: &PluginIndex,
    manual: &ManualStore,
    history: &HistoryStore,
    weights: &Weights,
    threshold_k: f64,
    now: i64,
) -> Vec<CorrelationEdge> {
    let n = snapshot.len();
    let mut coefficients = Vec::with_capacity(n.saturating_mul(n.saturating_sub(1)));
    let mut pairs = Vec::with_capacity(coefficients.capacity());

    for (i, a) in snapshot.iter().enumerate() {
        for (j, b) in snapshot.iter().enumerate() {
            if i == j {
                continue;
            }

            let bayes_score = bayes.correlation(a.type_key, b.type_key, history, now);
            let kb_score = match (&a.hyperalert, &b.hyperalert) {
                (Some(ha), Some(hb)) => korr_kb::similarity(&ha.post, &hb.pre),
                _ => 0.0,
            };
            let view_a = PluginAlertView::from(a);
            let view_b = PluginAlertView::from(b);
            let plugin_contributions = plugins.contributions(&view_a, &view_b);

            let coefficient = combine(weights, bayes_score, kb_score, &plugin_contributions);
            coefficients.push(coefficient);
            pairs.push((i, j, a.type_key, b.type_key, coefficient));
        }
    }

    let (mean, stddev) = mean_and_stddev(&coefficients);
    let threshold = mean + threshold_k * stddev;

    pairs
        .into_iter()
        .filter_map(|(i, j, from_key, to_key, coefficient)| {
            let verdict = manual.lookup(from_key, to_key);
            resolve_override(verdict, coefficient, threshold).map(|coefficient| CorrelationEdge {
                from: i,
                to: j,
                coefficient,
            })
        })
        .collect()
}
