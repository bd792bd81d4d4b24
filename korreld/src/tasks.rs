use crate::state::{now_secs, AppState};
use korr_cluster::collapse;
use korr_ingest::AlertSource;
use korr_neural::features;
use korr_outdb::Edge;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run `body` on every tick of a `period`-second interval, stopping
/// between ticks (never mid-iteration) once `token` is cancelled.
async fn run_periodic<F, Fut>(period_secs: u64, token: CancellationToken, label: &'static str, mut body: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    if period_secs == 0 {
        warn!(task = label, "period is zero, task disabled");
        return;
    }
    let mut ticker = interval(Duration::from_secs(period_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => body().await,
            _ = token.cancelled() => {
                info!(task = label, "shutting down");
                return;
            }
        }
    }
}

/// Tails the alert source and stages newly ingested alerts for clustering.
/// Not governed by a config interval; runs on a fixed short cadence
/// instead.
pub async fn ingest_task(state: Arc<AppState>, source: Arc<dyn AlertSource + Send + Sync>, token: CancellationToken) {
    const INGEST_POLL_SECS: u64 = 1;
    run_periodic(INGEST_POLL_SECS, token, "ingest", || {
        let state = state.clone();
        let source = source.clone();
        async move {
            match source.poll() {
                Ok(count) if count > 0 => {
                    let alerts = source.list();
                    let batch: Vec<_> = alerts.iter().map(|a| (a.type_key, a.timestamp)).collect();
                    if let Err(error) = state.history.append(&batch) {
                        warn!(%error, "failed to append ingested alerts to history");
                    }
                    state.intake.lock().await.extend(alerts);
                    info!(count, "ingested alerts");
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "alert source poll failed"),
            }
        }
    })
    .await;
}

/// Labels and collapses alerts accumulated since the last tick
/// (spec.md §4.4), handing the survivors to the correlation stage.
pub async fn clustering_task(state: Arc<AppState>, token: CancellationToken) {
    let period = state.config.alert_clustering_interval;
    let window = state.config.cluster_max_alert_interval;
    run_periodic(period, token, "clustering", || {
        let state = state.clone();
        async move {
            let mut batch = std::mem::take(&mut *state.intake.lock().await);
            if batch.is_empty() {
                return;
            }
            {
                let mut hierarchy = state.hierarchy.lock().await;
                for alert in batch.iter_mut() {
                    alert.cluster = hierarchy.label(alert);
                }
            }
            let collapsed = collapse(batch, window);
            info!(remaining = collapsed.len(), "collapsed alert batch");
            state.clustered.lock().await.extend(collapsed);
        }
    })
    .await;
}

/// Enriches and scores the clustered working set, producing the
/// correlation graph for this period (spec.md §4.9).
pub async fn correlation_task(state: Arc<AppState>, token: CancellationToken) {
    let period = state.config.correlation_graph_interval;
    let threshold_k = state.config.correlation_threshold_coefficient;
    run_periodic(period, token, "correlation", || {
        let state = state.clone();
        async move {
            let mut snapshot = std::mem::take(&mut *state.clustered.lock().await);
            if snapshot.is_empty() {
                return;
            }
            if let Err(error) = korr_engine::enrich(&mut snapshot, &state.kb) {
                warn!(%error, "knowledge-base enrichment failed, skipping this batch");
                return;
            }
            let edges = korr_engine::score_and_threshold(
                &snapshot,
                &state.bayes,
                &state.kb,
                &state.plugins,
                &state.manual,
                &state.history,
                &state.weights,
                threshold_k,
                now_secs(),
            );
            info!(alerts = snapshot.len(), edges = edges.len(), "scored correlation batch");
            let mut pending = state.pending_persist.lock().await;
            let offset = pending.0.len();
            pending.0.extend(snapshot);
            pending.1.extend(edges.into_iter().map(|e| korr_engine::CorrelationEdge {
                from: e.from + offset,
                to: e.to + offset,
                coefficient: e.coefficient,
            }));
        }
    })
    .await;
}

/// Persists the accumulated scored batch to the output database
/// (spec.md §4.11). A no-op, with a one-time warning, when no output
/// database is configured.
pub async fn serialization_task(state: Arc<AppState>, token: CancellationToken) {
    let period = state.config.alert_serialization_interval;
    run_periodic(period, token, "serialization", || {
        let state = state.clone();
        async move {
            let Some(sink) = state.output_sink.as_deref() else {
                return;
            };
            let (mut alerts, edges) = std::mem::take(&mut *state.pending_persist.lock().await);
            if alerts.is_empty() {
                return;
            }
            let edges: Vec<Edge> = edges
                .into_iter()
                .map(|e| Edge { from: e.from, to: e.to, coefficient: e.coefficient })
                .collect();
            let report = korr_outdb::persist_batch(sink, &mut alerts, &edges).await;
            info!(?report, "persisted alert batch");
        }
    })
    .await;
}

/// Reparses the manual override directive files and swaps them in
/// atomically (spec.md §4.10).
pub async fn manual_reload_task(state: Arc<AppState>, token: CancellationToken) {
    let period = state.config.manual_correlations_parsing_interval;
    run_periodic(period, token, "manual-reload", || {
        let state = state.clone();
        async move { state.manual.reload() }
    })
    .await;
}

/// Expires idle TCP flows out of the stream tracker (spec.md §4.1).
pub async fn stream_sweep_task(state: Arc<AppState>, token: CancellationToken) {
    let period = state.config.tcp_stream_expire_interval;
    run_periodic(period, token, "stream-sweep", || {
        let state = state.clone();
        async move { state.tracker.sweep(now_secs()) }
    })
    .await;
}

/// Bounds the in-memory working buffers to `alert_bufsize`, dropping the
/// oldest entries once exceeded. The stream tracker's flows expire on
/// their own dedicated timer, so this tick's job is buffer capacity
/// enforcement only.
pub async fn hashtable_cleanup_task(state: Arc<AppState>, token: CancellationToken) {
    let period = state.config.hashtable_cleanup_interval;
    let cap = state.config.alert_bufsize;
    run_periodic(period, token, "hashtable-cleanup", || {
        let state = state.clone();
        async move {
            let mut intake = state.intake.lock().await;
            if intake.len() > cap {
                let drop_count = intake.len() - cap;
                intake.drain(0..drop_count);
                warn!(drop_count, "intake buffer exceeded capacity, dropped oldest alerts");
            }
        }
    })
    .await;
}

/// Retrains the self-organizing map over the alert type keys seen so far
/// (spec.md §4.8) and persists it.
pub async fn neural_training_task(state: Arc<AppState>, token: CancellationToken) {
    let period = state.config.neural_network_training_interval;
    let steps = state.config.neural_train_steps;
    let path = state.config.clusterfile.clone();
    run_periodic(period, token, "neural-training", || {
        let state = state.clone();
        let path = path.clone();
        async move {
            let samples: Vec<[f64; korr_neural::FEATURES]> = {
                let pending = state.pending_persist.lock().await;
                pending.0.iter().map(features).collect()
            };
            if samples.is_empty() {
                return;
            }
            let mut som = state.som.lock().await;
            if som.rows() == 0 {
                return;
            }
            if som.epoch_of_last_train() == 0 {
                som.init_weights(&samples);
            }
            som.train(&samples, steps, now_secs());
            if let Err(error) = som.save(&path) {
                warn!(%error, "failed to persist trained som");
            } else {
                info!(samples = samples.len(), "retrained self-organizing map");
            }
        }
    })
    .await;
}
