//! Global latency testing
//!
//! TCP connect time to geographically spread endpoints on port 80, ranked
//! to pick a server location.

use crate::aggregate::{mean, TimingStats};
use crate::catalog::{global_endpoints, LocationTarget};
use crate::prober::{Probe, Prober, SampleSet};
use crate::ranker::{location_key, rank_records};
use crate::settings::ProbeSettings;
use crate::transport;
use async_trait::async_trait;
use netscope_common::{round_to, LocationRecord, NetscopeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const LOCATION_PORT: u16 = 80;

struct ConnectProbe;

#[async_trait]
impl Probe for ConnectProbe {
    type Target = LocationTarget;
    type Sample = Duration;

    fn label(target: &LocationTarget) -> String {
        target.host.clone()
    }

    async fn attempt(&self, target: &LocationTarget, _index: u32) -> NetscopeResult<Duration> {
        transport::tcp_connect(&target.host, LOCATION_PORT).await
    }
}

/// Latency to one region, summarised over its reachable endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    /// Region name
    pub region: String,
    /// Mean of endpoint averages
    pub avg_ms: f64,
    /// Best endpoint average
    pub best_ms: f64,
    /// Reachable endpoints in this region
    pub endpoints_tested: u32,
}

/// Runs the global latency family
pub struct LocationTester {
    prober: Prober,
}

impl LocationTester {
    /// Create a tester
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            prober: Prober::new(settings),
        }
    }

    /// Test every endpoint (the built-in catalog when `endpoints` is empty)
    pub async fn test_all(&self, endpoints: Vec<LocationTarget>) -> Vec<LocationRecord> {
        let endpoints = if endpoints.is_empty() {
            global_endpoints()
        } else {
            endpoints
        };
        info!(endpoints = endpoints.len(), "starting location test");

        let mut records: Vec<_> = self
            .prober
            .run(Arc::new(ConnectProbe), &endpoints)
            .await
            .into_iter()
            .map(|(target, samples)| to_record(target, &samples))
            .collect();

        rank_records(&mut records, location_key);
        records
    }

    /// Test a single host outside the catalog
    pub async fn test_single(
        &self,
        host: &str,
        country: &str,
        region: &str,
        city: &str,
    ) -> LocationRecord {
        let target = LocationTarget {
            host: host.into(),
            country: country.into(),
            region: region.into(),
            city: city.into(),
        };
        let samples = self.prober.sample(&ConnectProbe, &target).await;
        to_record(target, &samples)
    }
}

fn to_record(target: LocationTarget, samples: &SampleSet) -> LocationRecord {
    let stats = TimingStats::from_set(samples);
    LocationRecord {
        host: target.host,
        country: target.country,
        region: target.region,
        city: target.city,
        avg_ms: stats.avg_ms,
        min_ms: stats.min_ms,
        max_ms: stats.max_ms,
        jitter_ms: stats.jitter_ms,
        packet_loss_pct: stats.packet_loss_pct(),
        reachable: stats.reachable(),
        stability_score: stats.stability_score,
        rank: 0,
    }
}

/// First `n` reachable records of a ranked report
pub fn best_locations(records: &[LocationRecord], n: usize) -> Vec<LocationRecord> {
    records.iter().filter(|r| r.reachable).take(n).cloned().collect()
}

/// Per-region latency over reachable records, fastest region first
pub fn region_summary(records: &[LocationRecord]) -> Vec<RegionSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_region: HashMap<&str, Vec<f64>> = HashMap::new();

    for record in records.iter().filter(|r| r.reachable) {
        let region = record.region.as_str();
        by_region
            .entry(region)
            .or_insert_with(|| {
                order.push(region);
                Vec::new()
            })
            .push(record.avg_ms);
    }

    let mut summary: Vec<_> = order
        .into_iter()
        .filter_map(|region| {
            let latencies = by_region.get(region)?;
            Some(RegionSummary {
                region: region.to_string(),
                avg_ms: round_to(mean(latencies)?, 2),
                best_ms: round_to(latencies.iter().copied().fold(f64::INFINITY, f64::min), 2),
                endpoints_tested: latencies.len() as u32,
            })
        })
        .collect();

    summary.sort_by(|a, b| a.avg_ms.total_cmp(&b.avg_ms));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use netscope_common::SENTINEL_MS;

    fn record(city: &str, region: &str, avg_ms: f64, reachable: bool) -> LocationRecord {
        LocationRecord {
            host: format!("{}.example", city.to_lowercase()),
            city: city.into(),
            region: region.into(),
            avg_ms: if reachable { avg_ms } else { SENTINEL_MS },
            reachable,
            ..Default::default()
        }
    }

    #[test]
    fn test_region_summary() {
        let records = vec![
            record("London", "Europe", 40.0, true),
            record("Tokyo", "Asia", 200.0, true),
            record("Paris", "Europe", 60.0, true),
            record("Mumbai", "Asia", 0.0, false),
        ];
        let summary = region_summary(&records);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].region, "Europe");
        assert_eq!(summary[0].avg_ms, 50.0);
        assert_eq!(summary[0].best_ms, 40.0);
        assert_eq!(summary[0].endpoints_tested, 2);
        assert_eq!(summary[1].endpoints_tested, 1);
    }

    #[test]
    fn test_best_locations_skips_unreachable() {
        let records = vec![
            record("London", "Europe", 40.0, true),
            record("Paris", "Europe", 60.0, true),
            record("Mumbai", "Asia", 0.0, false),
        ];
        let best = best_locations(&records, 5);
        assert_eq!(best.len(), 2);
        assert_eq!(best_locations(&records, 1)[0].city, "London");
    }

    #[test]
    fn test_record_from_failed_samples() {
        let target = LocationTarget {
            host: "unreachable.example".into(),
            country: "US".into(),
            region: "North America".into(),
            city: "Dallas".into(),
        };
        let record = to_record(target, &SampleSet { successes: vec![], failures: 5 });
        assert!(!record.reachable);
        assert_eq!(record.avg_ms, SENTINEL_MS);
        assert_eq!(record.packet_loss_pct, 100.0);
        assert_eq!(record.stability_score, 0.0);
    }
}
