use korr_bayes::BayesianIndex;
use korr_core::headers::{Ipv4Header, Transport, PROTO_TCP};
use korr_core::{Alert, AlertTypeKey};
use korr_engine::{enrich, score_and_threshold, Weights};
use korr_history::HistoryStore;
use korr_kb::KbIndex;
use korr_manual::ManualStore;
use korr_plugin::PluginIndex;
use std::net::Ipv4Addr;
use std::path::PathBuf;

fn sample_ip(src: u8, dst: u8) -> Ipv4Header {
    Ipv4Header {
        tos: 0,
        total_length: 40,
        id: 1,
        ttl: 64,
        protocol: PROTO_TCP,
        src: Ipv4Addr::new(10, 0, 0, src),
        dst: Ipv4Addr::new(10, 0, 0, dst),
    }
}

#[test]
fn manual_force_correlate_survives_a_low_computed_score() {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryStore::load(dir.path().join("history.db")).unwrap();
    let bayes = BayesianIndex::new(300, 600);
    let kb = KbIndex::new(dir.path().join("rules"));
    let plugins = PluginIndex::discover(&dir.path().join("plugins")).unwrap();

    let key_a = AlertTypeKey::new(1, 1000, 1);
    let key_b = AlertTypeKey::new(1, 2000, 1);

    let correlate_path = dir.path().join("manual_correlations.xml");
    std::fs::write(
        &correlate_path,
        format!(
            r#"<correlations><correlation>
                <from gid="{}" sid="{}" rev="{}"/>
                <to gid="{}" sid="{}" rev="{}"/>
            </correlation></correlations>"#,
            key_a.gid, key_a.sid, key_a.rev, key_b.gid, key_b.sid, key_b.rev
        ),
    )
    .unwrap();
    let manual = ManualStore::new(correlate_path, dir.path().join("manual_uncorrelations.xml"));
    manual.reload();

    let mut snapshot = vec![
        Alert::new(key_a, 3, 100, sample_ip(1, 2), Transport::Other),
        Alert::new(key_b, 3, 101, sample_ip(3, 4), Transport::Other),
    ];
    enrich(&mut snapshot, &kb).unwrap();

    let weights = Weights {
        bayes: 1.0,
        kb: 1.0,
        baseline: 1.0,
    };
    // a huge threshold coefficient guarantees the computed score alone
    // would never clear the threshold.
    let edges = score_and_threshold(&snapshot, &bayes, &kb, &plugins, &manual, &history, &weights, 1000.0, 200);

    let forced = edges.iter().find(|e| e.from == 0 && e.to == 1);
    assert!(forced.is_some(), "force-correlate pair must produce an edge even below threshold");
}

#[test]
fn with_no_overrides_and_identical_signal_no_edges_exceed_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryStore::load(dir.path().join("history.db")).unwrap();
    let bayes = BayesianIndex::new(300, 600);
    let kb = KbIndex::new(dir.path().join("rules"));
    let plugins = PluginIndex::discover(&dir.path().join("plugins")).unwrap();
    let manual = ManualStore::new(
        PathBuf::from("/nonexistent/manual_correlations.xml"),
        PathBuf::from("/nonexistent/manual_uncorrelations.xml"),
    );
    manual.reload();

    let key_a = AlertTypeKey::new(1, 1000, 1);
    let key_b = AlertTypeKey::new(1, 2000, 1);
    let mut snapshot = vec![
        Alert::new(key_a, 3, 100, sample_ip(1, 2), Transport::Other),
        Alert::new(key_b, 3, 101, sample_ip(3, 4), Transport::Other),
        Alert::new(key_a, 3, 102, sample_ip(1, 2), Transport::Other),
    ];
    enrich(&mut snapshot, &kb).unwrap();

    let weights = Weights::from_config(&korr_config::Config::default());
    let edges = score_and_threshold(&snapshot, &bayes, &kb, &plugins, &manual, &history, &weights, 0.0, 200);

    // with a zero-stddev coefficient (every pair scores the same baseline),
    // threshold == mean, so C(a,b) >= threshold holds for every pair.
    assert_eq!(edges.len(), 6);
}
