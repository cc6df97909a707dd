//! DNS resolver benchmarking
//!
//! Each resolver is asked for the A record of every test domain several
//! times over UDP. Only round-trip timing is observed.

use crate::aggregate::TimingStats;
use crate::catalog::{public_dns_servers, DnsServer, TEST_DOMAINS};
use crate::prober::{Probe, Prober, SampleSet};
use crate::ranker::{dns_key, rank_records};
use crate::settings::ProbeSettings;
use crate::transport;
use async_trait::async_trait;
use netscope_common::{DnsRecord, NetscopeError, NetscopeResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Queries per test domain
pub const QUERIES_PER_DOMAIN: u32 = 5;

struct QueryProbe {
    domains: Vec<String>,
    per_domain: u32,
}

impl QueryProbe {
    fn domain_for(&self, index: u32) -> &str {
        let slot = (index / self.per_domain.max(1)) as usize;
        self.domains
            .get(slot % self.domains.len().max(1))
            .map(String::as_str)
            .unwrap_or("google.com")
    }
}

#[async_trait]
impl Probe for QueryProbe {
    type Target = DnsServer;
    type Sample = Duration;

    fn label(target: &DnsServer) -> String {
        format!("{} ({})", target.name, target.ip)
    }

    async fn attempt(&self, target: &DnsServer, index: u32) -> NetscopeResult<Duration> {
        transport::dns_query(&target.ip, self.domain_for(index)).await
    }
}

/// Benchmarks resolvers and keeps the history of full runs
pub struct DnsAnalyzer {
    prober: Prober,
    probe: Arc<QueryProbe>,
    history: Mutex<Vec<Vec<DnsRecord>>>,
}

impl DnsAnalyzer {
    /// Create an analyzer using the built-in test domains.
    ///
    /// `settings.samples` is replaced by `domains * QUERIES_PER_DOMAIN`.
    pub fn new(settings: ProbeSettings) -> Self {
        let domains: Vec<String> = TEST_DOMAINS.iter().map(|d| (*d).to_string()).collect();
        let settings = ProbeSettings {
            samples: domains.len() as u32 * QUERIES_PER_DOMAIN,
            ..settings
        };
        Self {
            prober: Prober::new(settings),
            probe: Arc::new(QueryProbe {
                domains,
                per_domain: QUERIES_PER_DOMAIN,
            }),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Benchmark every resolver (the built-in catalog when `servers` is empty)
    pub async fn benchmark_all(&self, servers: Vec<DnsServer>) -> Vec<DnsRecord> {
        let servers = if servers.is_empty() {
            public_dns_servers()
        } else {
            servers
        };
        info!(servers = servers.len(), "starting DNS benchmark");

        let mut records: Vec<_> = self
            .prober
            .run(Arc::clone(&self.probe), &servers)
            .await
            .into_iter()
            .map(|(server, samples)| to_record(server, &samples))
            .collect();

        rank_records(&mut records, dns_key);
        self.history.lock().push(records.clone());
        records
    }

    /// Benchmark one caller-supplied resolver.
    pub async fn benchmark_custom(&self, name: &str, ip: &str) -> NetscopeResult<DnsRecord> {
        let ip = ip.trim();
        if ip.is_empty() {
            return Err(NetscopeError::InvalidRequest("IP required".into()));
        }
        let server = DnsServer {
            name: if name.trim().is_empty() { "Custom".into() } else { name.into() },
            ip: ip.into(),
            secondary: None,
        };
        let samples = self.prober.sample(self.probe.as_ref(), &server).await;
        Ok(to_record(server, &samples))
    }

    /// Every ranked report produced by this analyzer, oldest first
    pub fn history(&self) -> Vec<Vec<DnsRecord>> {
        self.history.lock().clone()
    }
}

fn to_record(server: DnsServer, samples: &SampleSet) -> DnsRecord {
    let stats = TimingStats::from_set(samples);
    DnsRecord {
        name: server.name,
        ip: server.ip,
        avg_ms: stats.avg_ms,
        min_ms: stats.min_ms,
        max_ms: stats.max_ms,
        reliability_pct: stats.reliability_pct(),
        error_count: stats.failures(),
        total_queries: stats.attempts,
        reachable: stats.reachable(),
        stability_score: stats.stability_score,
        rank: 0,
    }
}

/// First `n` reachable resolvers of a ranked report
pub fn best_dns(records: &[DnsRecord], n: usize) -> Vec<DnsRecord> {
    records.iter().filter(|r| r.reachable).take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_rotation() {
        let probe = QueryProbe {
            domains: vec!["a.com".into(), "b.com".into()],
            per_domain: 3,
        };
        let picked: Vec<_> = (0..6).map(|i| probe.domain_for(i)).collect();
        assert_eq!(picked, vec!["a.com", "a.com", "a.com", "b.com", "b.com", "b.com"]);
    }

    #[test]
    fn test_analyzer_queries_every_domain() {
        let analyzer = DnsAnalyzer::new(ProbeSettings::dns(1, 1));
        assert_eq!(analyzer.prober.settings().samples, 25);
    }

    #[tokio::test]
    async fn test_custom_requires_ip() {
        let analyzer = DnsAnalyzer::new(ProbeSettings::dns(5, 5));
        let err = analyzer.benchmark_custom("Mine", "  ").await.unwrap_err();
        assert!(matches!(err, NetscopeError::InvalidRequest(_)));
        assert_eq!(err.to_string(), "invalid request: IP required");
    }

    #[test]
    fn test_record_counts() {
        let server = DnsServer {
            name: "Quad9".into(),
            ip: "9.9.9.9".into(),
            secondary: None,
        };
        let samples = SampleSet {
            successes: vec![Duration::from_millis(20); 20],
            failures: 5,
        };
        let record = to_record(server, &samples);
        assert_eq!(record.total_queries, 25);
        assert_eq!(record.error_count, 5);
        assert_eq!(record.reliability_pct, 80.0);
        assert!(record.reachable);
    }

    #[test]
    fn test_history_starts_empty() {
        let analyzer = DnsAnalyzer::new(ProbeSettings::dns(5, 5));
        assert!(analyzer.history().is_empty());
    }
}
