use std::path::PathBuf;

/// Which of the two supported dialects a database connection speaks.
/// The preprocessor this engine replaces supported exactly these two
/// (`HAVE_LIBMYSQLCLIENT` / `HAVE_LIBPQ`); a third dialect is out of
/// scope (spec.md §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbKind {
    Postgres,
    Mysql,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub kind: DbKind,
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
}

fn default_db_port() -> u16 {
    5432
}

/// One `cluster(class, name, range)` configuration entry: a single
/// hierarchy node to be attached to the generalization tree for `class`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClusterNodeSpec {
    pub class: ClusterClass,
    pub name: String,
    /// Inclusive numeric range, `min..=max`.
    pub range: (u64, u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterClass {
    SrcPort,
    DstPort,
    SrcIpv4,
    DstIpv4,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub hashtable_cleanup_interval: u64,
    pub tcp_stream_expire_interval: u64,
    pub alert_clustering_interval: u64,
    pub correlation_graph_interval: u64,
    pub alert_serialization_interval: u64,
    pub database_parsing_interval: u64,
    /// `T_win` in the bayesian kernel, seconds.
    pub bayesian_correlation_interval: i64,
    pub bayesian_correlation_cache_validity: u64,
    pub manual_correlations_parsing_interval: u64,
    /// Cluster window: alerts within this many seconds of each other may
    /// be collapsed (spec.md §4.4).
    pub cluster_max_alert_interval: i64,
    pub neural_network_training_interval: u64,
    pub neural_train_steps: usize,
    pub output_neurons_per_side: usize,
    /// Baseline weight for the built-in alert-correlation term, keeping
    /// the combine formula defined when no plugins are loaded.
    pub alert_correlation_weight: f64,
    /// `k` in `threshold = mean + k * stddev`.
    pub correlation_threshold_coefficient: f64,
    pub alert_bufsize: usize,
    pub webserv_port: u16,
    pub webserv_banner: String,
    pub alertfile: PathBuf,
    pub alert_history_file: PathBuf,
    pub clusterfile: PathBuf,
    pub correlation_rules_dir: PathBuf,
    /// Directory holding `manual_correlations.xml` / `manual_uncorrelations.xml`.
    pub correlated_alerts_dir: PathBuf,
    pub webserv_dir: PathBuf,
    pub corr_modules_dir: PathBuf,
    pub database: Option<DatabaseConfig>,
    pub output_database: Option<DatabaseConfig>,
    #[serde(default)]
    pub cluster: Vec<ClusterNodeSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hashtable_cleanup_interval: 120,
            tcp_stream_expire_interval: 300,
            alert_clustering_interval: 60,
            correlation_graph_interval: 60,
            alert_serialization_interval: 30,
            database_parsing_interval: 10,
            bayesian_correlation_interval: 300,
            bayesian_correlation_cache_validity: 600,
            manual_correlations_parsing_interval: 120,
            cluster_max_alert_interval: 60,
            neural_network_training_interval: 3600,
            neural_train_steps: 1000,
            output_neurons_per_side: 20,
            alert_correlation_weight: 1.0,
            correlation_threshold_coefficient: 1.0,
            alert_bufsize: 4096,
            webserv_port: 7654,
            webserv_banner: "korrelator".to_string(),
            alertfile: PathBuf::from("/var/log/snort/alert"),
            alert_history_file: PathBuf::from("/var/lib/korrelator/history.db"),
            clusterfile: PathBuf::from("/var/lib/korrelator/som.net"),
            correlation_rules_dir: PathBuf::from("/etc/korrelator/rules"),
            correlated_alerts_dir: PathBuf::from("/etc/korrelator/overrides"),
            webserv_dir: PathBuf::from("/var/www/korrelator"),
            corr_modules_dir: PathBuf::from("/etc/korrelator/modules"),
            database: None,
            output_database: None,
            cluster: Vec::new(),
        }
    }
}
