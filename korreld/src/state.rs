use anyhow::{Context, Result};
use korr_bayes::BayesianIndex;
use korr_cluster::Hierarchy;
use korr_config::Config;
use korr_core::Alert;
use korr_engine::{CorrelationEdge, Weights};
use korr_history::HistoryStore;
use korr_kb::KbIndex;
use korr_manual::ManualStore;
use korr_neural::Som;
use korr_outdb::OutputSink;
use korr_plugin::PluginIndex;
use korr_stream::StreamTracker;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything the scheduled tasks (`tasks.rs`) share, built once at
/// startup from the loaded configuration.
pub struct AppState {
    pub config: Config,
    pub tracker: Arc<StreamTracker>,
    pub history: HistoryStore,
    pub manual: ManualStore,
    pub bayes: BayesianIndex,
    pub kb: KbIndex,
    pub plugins: PluginIndex,
    pub hierarchy: Mutex<Hierarchy>,
    pub som: Mutex<Som>,
    pub weights: Weights,
    pub output_sink: Option<Box<dyn OutputSink>>,

    /// Freshly ingested alerts, awaiting the next clustering pass.
    pub intake: Mutex<Vec<Alert>>,
    /// Clustered alerts, awaiting the next correlation pass.
    pub clustered: Mutex<Vec<Alert>>,
    /// Scored alerts plus their surviving correlation edges, awaiting
    /// the next serialization pass.
    pub pending_persist: Mutex<(Vec<Alert>, Vec<CorrelationEdge>)>,
}

impl AppState {
    pub fn build(config: Config, output_sink: Option<Box<dyn OutputSink>>) -> Result<Self> {
        let now = now_secs();
        let tracker = Arc::new(StreamTracker::new(now, config.tcp_stream_expire_interval as i64));

        let history = HistoryStore::load(config.alert_history_file.clone())
            .context("loading alert history store")?;

        let manual = ManualStore::new(
            config.correlated_alerts_dir.join("manual_correlations.xml"),
            config.correlated_alerts_dir.join("manual_uncorrelations.xml"),
        );
        manual.reload();

        let bayes = BayesianIndex::new(
            config.bayesian_correlation_interval,
            config.bayesian_correlation_cache_validity as i64,
        );
        let kb = KbIndex::new(config.correlation_rules_dir.clone());
        let plugins =
            PluginIndex::discover(&config.corr_modules_dir).context("discovering correlation plugins")?;
        let hierarchy = Hierarchy::from_specs(&config.cluster);
        let side = config.output_neurons_per_side;
        let som = if config.clusterfile.exists() {
            Som::load(&config.clusterfile).context("loading persisted self-organizing map")?
        } else {
            Som::new(side, side)
        };
        let weights = Weights::from_config(&config);

        Ok(Self {
            config,
            tracker,
            history,
            manual,
            bayes,
            kb,
            plugins,
            hierarchy: Mutex::new(hierarchy),
            som: Mutex::new(som),
            weights,
            output_sink,
            intake: Mutex::new(Vec::new()),
            clustered: Mutex::new(Vec::new()),
            pending_persist: Mutex::new((Vec::new(), Vec::new())),
        })
    }
}

pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
