use korr_core::{Alert, AlertTypeKey, ClusterGeneralization, NodeId};
use std::collections::HashMap;

/// Group key: type-key plus the generalized src-side (port, addr) and
/// dst-side (port, addr) pair. Two alerts collapse only when they agree
/// on type and on both generalized endpoints.
type GroupKey = (
    AlertTypeKey,
    (Option<NodeId>, Option<NodeId>),
    (Option<NodeId>, Option<NodeId>),
);

fn group_key(alert: &Alert) -> GroupKey {
    let c: ClusterGeneralization = alert.cluster;
    (
        alert.type_key,
        (c.src_port, c.src_addr),
        (c.dst_port, c.dst_addr),
    )
}

/// Collapse alerts that share a group key and fall within `window_secs`
/// of each other's timestamp into a single representative whose
/// `grouped_count` accumulates the suppressed ones. Input order is not
/// assumed to be sorted; output preserves representative insertion order
/// within each group but groups are emitted in first-seen order.
///
/// Suppressed alerts are dropped from the returned vector — callers that
/// need the full history (spec.md §4.4: "retained for history") must
/// persist the pre-collapse batch separately, e.g. via the history store
/// append that happens at ingestion time.
pub fn collapse(alerts: Vec<Alert>, window_secs: i64) -> Vec<Alert> {
    let mut groups: HashMap<GroupKey, Vec<Alert>> = HashMap::new();
    let mut order: Vec<GroupKey> = Vec::new();

    for alert in alerts {
        let key = group_key(&alert);
        if !groups.contains_key(&key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(alert);
    }

    let mut result = Vec::new();
    for key in order {
        let mut members = groups.remove(&key).unwrap();
        members.sort_by_key(|a| a.timestamp);

        let mut iter = members.into_iter();
        let Some(mut representative) = iter.next() else {
            continue;
        };

        for alert in iter {
            if alert.timestamp - representative.timestamp <= window_secs {
                representative.grouped_count += alert.grouped_count;
            } else {
                result.push(representative);
                representative = alert;
            }
        }
        result.push(representative);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use korr_core::headers::{Ipv4Header, Transport, PROTO_TCP};
    use std::net::Ipv4Addr;

    fn alert_at(ts: i64) -> Alert {
        Alert::new(
            AlertTypeKey::new(1, 1000, 1),
            3,
            ts,
            Ipv4Header {
                tos: 0,
                total_length: 40,
                id: 1,
                ttl: 64,
                protocol: PROTO_TCP,
                src: Ipv4Addr::new(10, 0, 0, 1),
                dst: Ipv4Addr::new(10, 0, 0, 2),
            },
            Transport::Other,
        )
    }

    #[test]
    fn alerts_within_window_collapse_into_one_representative() {
        let alerts = vec![alert_at(0), alert_at(10), alert_at(20)];
        let result = collapse(alerts, 30);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].grouped_count, 3);
    }

    #[test]
    fn alerts_beyond_window_stay_separate() {
        let alerts = vec![alert_at(0), alert_at(1000)];
        let result = collapse(alerts, 30);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|a| a.grouped_count == 1));
    }

    #[test]
    fn different_type_keys_never_collapse() {
        let mut a = alert_at(0);
        let mut b = alert_at(5);
        b.type_key = AlertTypeKey::new(1, 2000, 1);
        let result = collapse(vec![a.clone(), b.clone()], 30);
        assert_eq!(result.len(), 2);
        let _ = (&mut a, &mut b);
    }
}
