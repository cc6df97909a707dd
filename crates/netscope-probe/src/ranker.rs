//! Family report ranking
//!
//! Every family is ordered by the same rule: reachable records first,
//! then ascending by a family-specific `(primary, secondary)` key. The
//! sort is stable and callers pass records in catalog order, so ties
//! resolve by catalog position.

use netscope_common::{
    CdnRecord, DnsRecord, LocationRecord, PortRecord, ProtocolRecord, Ranked,
};
use std::cmp::Ordering;

/// Sort `records` and assign contiguous 1-based ranks.
pub fn rank_records<R, K>(records: &mut [R], key: K)
where
    R: Ranked,
    K: Fn(&R) -> (f64, f64),
{
    records.sort_by(|a, b| {
        (!a.reachable())
            .cmp(&!b.reachable())
            .then_with(|| compare_keys(key(a), key(b)))
    });

    for (index, record) in records.iter_mut().enumerate() {
        record.set_rank(index as u32 + 1);
    }
}

#[inline]
fn compare_keys(a: (f64, f64), b: (f64, f64)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1))
}

/// Location: mean latency
#[inline]
pub fn location_key(record: &LocationRecord) -> (f64, f64) {
    (record.avg_ms, 0.0)
}

/// DNS: most reliable first, then mean latency
#[inline]
pub fn dns_key(record: &DnsRecord) -> (f64, f64) {
    (-record.reliability_pct, record.avg_ms)
}

/// CDN: connect plus download
#[inline]
pub fn cdn_key(record: &CdnRecord) -> (f64, f64) {
    (record.total_ms, 0.0)
}

/// Protocol summary: mean latency
#[inline]
pub fn protocol_key(record: &ProtocolRecord) -> (f64, f64) {
    (record.avg_ms, 0.0)
}

/// Port: mean connect time
#[inline]
pub fn port_key(record: &PortRecord) -> (f64, f64) {
    (record.avg_ms, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netscope_common::SENTINEL_MS;
    use proptest::prelude::*;

    fn port(port: u16, reachable: bool, avg_ms: f64) -> PortRecord {
        PortRecord {
            port,
            reachable,
            avg_ms: if reachable { avg_ms } else { SENTINEL_MS },
            ..Default::default()
        }
    }

    #[test]
    fn test_reachable_first_then_latency() {
        let mut records = vec![
            port(21, false, 0.0),
            port(80, true, 50.0),
            port(443, true, 20.0),
        ];
        rank_records(&mut records, port_key);

        let order: Vec<_> = records.iter().map(|r| (r.port, r.rank)).collect();
        assert_eq!(order, vec![(443, 1), (80, 2), (21, 3)]);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let mut records = vec![port(8080, true, 30.0), port(8443, true, 30.0)];
        rank_records(&mut records, port_key);
        assert_eq!(records[0].port, 8080);
        assert_eq!(records[1].port, 8443);
    }

    #[test]
    fn test_dns_prefers_reliability_over_speed() {
        let dns = |name: &str, reliability_pct: f64, avg_ms: f64| DnsRecord {
            name: name.into(),
            reliability_pct,
            avg_ms,
            reachable: true,
            ..Default::default()
        };
        let mut records = vec![dns("fast", 80.0, 5.0), dns("steady", 100.0, 40.0)];
        rank_records(&mut records, dns_key);
        assert_eq!(records[0].name, "steady");
        assert_eq!(records[0].rank, 1);
    }

    #[test]
    fn test_protocol_without_answers_ranks_last() {
        let mut records = vec![
            ProtocolRecord {
                protocol: "UDP".into(),
                ..Default::default()
            },
            ProtocolRecord {
                protocol: "TCP".into(),
                avg_ms: 35.0,
                ..Default::default()
            },
        ];
        rank_records(&mut records, protocol_key);
        assert_eq!(records[0].protocol, "TCP");
    }

    proptest! {
        #[test]
        fn prop_ranks_are_contiguous_and_partitioned(
            entries in prop::collection::vec((any::<bool>(), 0.0f64..2_000.0), 0..30)
        ) {
            let mut records: Vec<_> = entries
                .iter()
                .enumerate()
                .map(|(i, (reachable, avg))| port(i as u16, *reachable, *avg))
                .collect();
            rank_records(&mut records, port_key);

            for (index, record) in records.iter().enumerate() {
                prop_assert_eq!(record.rank, index as u32 + 1);
            }
            let first_unreachable = records.iter().position(|r| !r.reachable).unwrap_or(records.len());
            prop_assert!(records[first_unreachable..].iter().all(|r| !r.reachable));
            for pair in records[..first_unreachable].windows(2) {
                prop_assert!(pair[0].avg_ms <= pair[1].avg_ms);
            }
        }
    }
}
