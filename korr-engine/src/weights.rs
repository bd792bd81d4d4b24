use korr_config::Config;

/// Per-index weights for the combine formula (spec.md §4.9):
/// `C(a,b) = (Σ w_i f_i(a,b)) / Σ w_i` over `{bayesian, knowledge-base,
/// plugin-supplied, built-in alert-correlation}`.
///
/// Only the built-in baseline weight is user-configurable
/// (`alert_correlation_weight`); bayesian and knowledge-base each
/// contribute with a fixed weight of `1.0`, matching the combine formula's
/// treatment of them as always-present indices. The baseline term itself
/// contributes a constant score of `1.0`, keeping the denominator
/// non-zero when every other index is silent (no history, no rule files,
/// no plugins loaded).
#[derive(Debug, Clone, Copy)]
pub struct Weights {
    pub bayes: f64,
    pub kb: f64,
    pub baseline: f64,
}

impl Weights {
    pub const BASELINE_SCORE: f64 = 1.0;

    pub fn from_config(config: &Config) -> Self {
        Self {
            bayes: 1.0,
            kb: 1.0,
            baseline: config.alert_correlation_weight,
        }
    }
}
