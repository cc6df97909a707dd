//! Outbound port reachability
//!
//! Safe-mode scan: TCP connects to one well-known destination on a short
//! list of common service ports, always paced between attempts.

use crate::aggregate::TimingStats;
use crate::catalog::{common_ports, PortTarget, DEFAULT_PORT_TARGET};
use crate::prober::{Probe, Prober, SampleSet};
use crate::ranker::{port_key, rank_records};
use crate::settings::ProbeSettings;
use crate::transport;
use async_trait::async_trait;
use netscope_common::{NetscopeResult, PortRecord};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

struct PortProbe {
    destination: String,
}

#[async_trait]
impl Probe for PortProbe {
    type Target = PortTarget;
    type Sample = Duration;

    fn label(target: &PortTarget) -> String {
        format!("{} ({})", target.port, target.service)
    }

    async fn attempt(&self, target: &PortTarget, _index: u32) -> NetscopeResult<Duration> {
        transport::tcp_connect(&self.destination, target.port).await
    }
}

/// Runs the port family
pub struct PortScanner {
    prober: Prober,
}

impl PortScanner {
    /// Create a scanner
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            prober: Prober::new(settings),
        }
    }

    /// Scan every port on `destination` (defaults: 8.8.8.8, built-in port list)
    pub async fn scan_all(&self, destination: Option<&str>, ports: Vec<PortTarget>) -> Vec<PortRecord> {
        let destination = destination.unwrap_or(DEFAULT_PORT_TARGET).to_string();
        let ports = if ports.is_empty() { common_ports() } else { ports };
        info!(destination = %destination, ports = ports.len(), "starting port scan");

        let probe = Arc::new(PortProbe { destination });
        let mut records: Vec<_> = self
            .prober
            .run(probe, &ports)
            .await
            .into_iter()
            .map(|(port, samples)| to_record(port, &samples))
            .collect();

        rank_records(&mut records, port_key);
        records
    }

    /// Scan a single port
    pub async fn scan_single(
        &self,
        destination: &str,
        port: u16,
        service: &str,
        protocol: &str,
    ) -> PortRecord {
        let target = PortTarget {
            port,
            service: service.into(),
            protocol: if protocol.is_empty() { "TCP".into() } else { protocol.into() },
        };
        let probe = PortProbe {
            destination: destination.into(),
        };
        let samples = self.prober.sample(&probe, &target).await;
        to_record(target, &samples)
    }
}

fn to_record(target: PortTarget, samples: &SampleSet) -> PortRecord {
    let stats = TimingStats::from_set(samples);
    PortRecord {
        port: target.port,
        service: target.service,
        protocol: target.protocol,
        reachable: stats.reachable(),
        avg_ms: stats.avg_ms,
        stability_score: stats.stability_score,
        rank: 0,
    }
}

/// Reachable records of a ranked report
pub fn reachable_ports(records: &[PortRecord]) -> Vec<PortRecord> {
    records.iter().filter(|r| r.reachable).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use netscope_common::SENTINEL_MS;
    use tokio::net::TcpListener;

    fn fast_settings() -> ProbeSettings {
        ProbeSettings {
            samples: 2,
            timeout: Duration::from_millis(500),
            max_workers: 4,
            restricted: false,
            restricted_delay: Duration::from_millis(0),
            pacing: None,
        }
    }

    #[tokio::test]
    async fn test_scan_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    break;
                }
            }
        });

        // bind then drop to find a port with nothing listening
        let closed = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };

        let scanner = PortScanner::new(fast_settings());
        let records = scanner
            .scan_all(
                Some("127.0.0.1"),
                vec![
                    PortTarget { port: closed, service: "closed".into(), protocol: "TCP".into() },
                    PortTarget { port: open, service: "open".into(), protocol: "TCP".into() },
                ],
            )
            .await;
        accept.abort();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].port, open);
        assert!(records[0].reachable);
        assert_eq!(records[0].rank, 1);
        assert!(!records[1].reachable);
        assert_eq!(records[1].avg_ms, SENTINEL_MS);
        assert_eq!(reachable_ports(&records).len(), 1);
    }

    #[test]
    fn test_record_keeps_catalog_metadata() {
        let target = PortTarget {
            port: 51820,
            service: "WireGuard".into(),
            protocol: "UDP".into(),
        };
        let record = to_record(target, &SampleSet::default());
        assert_eq!(record.service, "WireGuard");
        assert_eq!(record.protocol, "UDP");
        assert!(!record.reachable);
    }
}
