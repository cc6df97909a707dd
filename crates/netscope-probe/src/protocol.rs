//! Protocol benchmarking
//!
//! Every protocol test runs against every protocol target. Only connect,
//! handshake or request timing is measured, never conformance. Results
//! are summarised per protocol across targets.

use crate::aggregate::{mean, TimingStats};
use crate::catalog::{protocol_targets, ProtocolTarget};
use crate::prober::{Probe, Prober};
use crate::ranker::{protocol_key, rank_records};
use crate::settings::ProbeSettings;
use crate::transport;
use async_trait::async_trait;
use netscope_common::{round_to, NetscopeResult, ProtocolRecord, SENTINEL_MS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_rustls::TlsConnector;
use tracing::info;

/// Longest wait for a UDP reply before the send alone counts.
///
/// Capped at half the attempt timeout, so silent UDP targets report a
/// shorter `avg_ms` than a wait for the full socket timeout would give.
const UDP_REPLY_WINDOW: Duration = Duration::from_secs(1);

/// Averages at or above this mean no sample succeeded
const UNANSWERED_MS: f64 = 9000.0;

/// Protocol under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolKind {
    /// Plain HTTP GET, no redirects
    Http,
    /// HTTPS GET, no redirects
    Https,
    /// TCP connect to 80
    Tcp,
    /// One-byte datagram to 53
    Udp,
    /// TCP connect plus TLS handshake on 443
    TlsHandshake,
    /// TCP connect to 443 as a WebSocket reachability proxy
    WebSocket,
}

impl ProtocolKind {
    /// Every protocol in report order
    pub const ALL: [ProtocolKind; 6] = [
        ProtocolKind::Http,
        ProtocolKind::Https,
        ProtocolKind::Tcp,
        ProtocolKind::Udp,
        ProtocolKind::TlsHandshake,
        ProtocolKind::WebSocket,
    ];

    /// Report label
    pub fn label(self) -> &'static str {
        match self {
            ProtocolKind::Http => "HTTP",
            ProtocolKind::Https => "HTTPS",
            ProtocolKind::Tcp => "TCP",
            ProtocolKind::Udp => "UDP",
            ProtocolKind::TlsHandshake => "TLS Handshake",
            ProtocolKind::WebSocket => "WebSocket (TCP)",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One protocol against one target
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolCase {
    /// Protocol
    pub kind: ProtocolKind,
    /// Target
    pub target: ProtocolTarget,
}

/// Per-(protocol, target) statistics before summarising
#[derive(Debug, Clone, PartialEq)]
pub struct CaseResult {
    /// Protocol
    pub kind: ProtocolKind,
    /// Target display name
    pub target: String,
    /// Mean time
    pub avg_ms: f64,
    /// Fastest time
    pub min_ms: f64,
    /// Slowest time
    pub max_ms: f64,
    /// Successful attempts (0-100)
    pub success_rate: f64,
}

struct CaseProbe {
    client: reqwest::Client,
    tls: TlsConnector,
    udp_window: Duration,
}

#[async_trait]
impl Probe for CaseProbe {
    type Target = ProtocolCase;
    type Sample = Duration;

    fn label(case: &ProtocolCase) -> String {
        format!("{}/{}", case.kind, case.target.name)
    }

    async fn attempt(&self, case: &ProtocolCase, _index: u32) -> NetscopeResult<Duration> {
        let host = case.target.host.as_str();
        match case.kind {
            ProtocolKind::Http => {
                transport::http_get(&self.client, &format!("http://{host}")).await
            }
            ProtocolKind::Https => {
                transport::http_get(&self.client, &format!("https://{host}")).await
            }
            ProtocolKind::Tcp => transport::tcp_connect(host, 80).await,
            ProtocolKind::Udp => transport::udp_exchange(host, 53, &[0], self.udp_window).await,
            ProtocolKind::TlsHandshake => transport::tls_handshake(&self.tls, host, 443).await,
            ProtocolKind::WebSocket => transport::tcp_connect(host, 443).await,
        }
    }
}

/// Runs the protocol family
pub struct ProtocolTester {
    prober: Prober,
    exchange: Arc<CaseProbe>,
}

impl ProtocolTester {
    /// Create a tester
    pub fn new(settings: ProbeSettings) -> NetscopeResult<Self> {
        let client = transport::http_client(settings.timeout, false)?;
        // keep the reply wait inside the per-attempt deadline
        let udp_window = UDP_REPLY_WINDOW.min(settings.timeout / 2);
        Ok(Self {
            prober: Prober::new(settings),
            exchange: Arc::new(CaseProbe {
                client,
                tls: transport::tls_connector(),
                udp_window,
            }),
        })
    }

    /// Every (protocol, target) result, in protocol then target order
    pub async fn detailed(&self, targets: Vec<ProtocolTarget>) -> Vec<CaseResult> {
        let targets = if targets.is_empty() {
            protocol_targets()
        } else {
            targets
        };
        let cases: Vec<ProtocolCase> = ProtocolKind::ALL
            .iter()
            .flat_map(|kind| {
                targets.iter().map(move |target| ProtocolCase {
                    kind: *kind,
                    target: target.clone(),
                })
            })
            .collect();
        info!(cases = cases.len(), "starting protocol benchmark");

        self.prober
            .run(Arc::clone(&self.exchange), &cases)
            .await
            .into_iter()
            .map(|(case, samples)| {
                let stats = TimingStats::from_set(&samples);
                CaseResult {
                    kind: case.kind,
                    target: case.target.name,
                    avg_ms: stats.avg_ms,
                    min_ms: stats.min_ms,
                    max_ms: stats.max_ms,
                    success_rate: stats.reliability_pct(),
                }
            })
            .collect()
    }

    /// Ranked per-protocol summary
    pub async fn benchmark_all(&self, targets: Vec<ProtocolTarget>) -> Vec<ProtocolRecord> {
        let cases = self.detailed(targets).await;
        let mut records = summarise(&cases);
        rank_records(&mut records, protocol_key);
        records
    }
}

/// Fold case results into one record per protocol.
///
/// Only cases with at least one success feed the averages; a protocol
/// with none keeps sentinel timings and a zero success rate.
pub fn summarise(cases: &[CaseResult]) -> Vec<ProtocolRecord> {
    ProtocolKind::ALL
        .iter()
        .filter_map(|kind| {
            let items: Vec<&CaseResult> = cases.iter().filter(|c| c.kind == *kind).collect();
            if items.is_empty() {
                return None;
            }
            let answered: Vec<&CaseResult> =
                items.iter().copied().filter(|c| c.avg_ms < UNANSWERED_MS).collect();

            let mut record = ProtocolRecord {
                protocol: kind.label().to_string(),
                targets_tested: items.len() as u32,
                ..Default::default()
            };

            if !answered.is_empty() {
                let avgs: Vec<f64> = answered.iter().map(|c| c.avg_ms).collect();
                let rates: Vec<f64> = answered.iter().map(|c| c.success_rate).collect();
                record.avg_ms = round_to(mean(&avgs).unwrap_or(SENTINEL_MS), 2);
                record.min_ms = round_to(
                    answered.iter().map(|c| c.min_ms).fold(f64::INFINITY, f64::min),
                    2,
                );
                record.max_ms = round_to(
                    answered.iter().map(|c| c.max_ms).fold(f64::NEG_INFINITY, f64::max),
                    2,
                );
                record.success_rate = round_to(mean(&rates).unwrap_or(0.0), 1);
            }

            Some(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(kind: ProtocolKind, target: &str, avg_ms: f64, success_rate: f64) -> CaseResult {
        CaseResult {
            kind,
            target: target.into(),
            avg_ms,
            min_ms: if avg_ms < UNANSWERED_MS { avg_ms - 5.0 } else { SENTINEL_MS },
            max_ms: if avg_ms < UNANSWERED_MS { avg_ms + 5.0 } else { SENTINEL_MS },
            success_rate,
        }
    }

    #[test]
    fn test_udp_reply_window_capped_by_timeout() {
        let mut settings = ProbeSettings::protocol();
        settings.timeout = Duration::from_millis(800);
        let tester = ProtocolTester::new(settings.clone()).unwrap();
        assert_eq!(tester.exchange.udp_window, Duration::from_millis(400));

        settings.timeout = Duration::from_secs(5);
        let tester = ProtocolTester::new(settings).unwrap();
        assert_eq!(tester.exchange.udp_window, UDP_REPLY_WINDOW);
    }

    #[test]
    fn test_summary_ignores_unanswered_targets() {
        let cases = vec![
            case(ProtocolKind::Tcp, "Google", 20.0, 100.0),
            case(ProtocolKind::Tcp, "Cloudflare", 40.0, 80.0),
            case(ProtocolKind::Tcp, "GitHub", SENTINEL_MS, 0.0),
        ];
        let summary = summarise(&cases);
        assert_eq!(summary.len(), 1);

        let tcp = &summary[0];
        assert_eq!(tcp.protocol, "TCP");
        assert_eq!(tcp.avg_ms, 30.0);
        assert_eq!(tcp.min_ms, 15.0);
        assert_eq!(tcp.max_ms, 45.0);
        assert_eq!(tcp.success_rate, 90.0);
        assert_eq!(tcp.targets_tested, 3);
    }

    #[test]
    fn test_protocol_without_answers_uses_sentinel() {
        let cases = vec![case(ProtocolKind::Udp, "Google", SENTINEL_MS, 0.0)];
        let summary = summarise(&cases);
        assert_eq!(summary[0].protocol, "UDP");
        assert_eq!(summary[0].avg_ms, SENTINEL_MS);
        assert_eq!(summary[0].success_rate, 0.0);
        assert_eq!(summary[0].targets_tested, 1);
    }

    #[test]
    fn test_summary_ranked_by_latency() {
        let cases = vec![
            case(ProtocolKind::Https, "Google", 300.0, 100.0),
            case(ProtocolKind::Tcp, "Google", 25.0, 100.0),
            case(ProtocolKind::TlsHandshake, "Google", 80.0, 100.0),
        ];
        let mut summary = summarise(&cases);
        rank_records(&mut summary, protocol_key);

        let order: Vec<_> = summary.iter().map(|r| r.protocol.as_str()).collect();
        assert_eq!(order, vec!["TCP", "TLS Handshake", "HTTPS"]);
        assert_eq!(summary[2].rank, 3);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ProtocolKind::WebSocket.to_string(), "WebSocket (TCP)");
        assert_eq!(ProtocolKind::ALL.len(), 6);
    }
}
