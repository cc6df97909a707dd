//! CDN edge testing
//!
//! An attempt is a TCP connect to the edge on 443 followed by a download
//! of the edge's test object. The connect decides success; a failed
//! download leaves the connect sample in place. The download runs under
//! its own window inside the attempt deadline so a slow object cannot
//! discard a good connect.

use crate::aggregate::{duration_ms, mean, stability_score};
use crate::catalog::{cdn_endpoints, CdnEndpoint};
use crate::prober::{Probe, Prober, SampleSet};
use crate::ranker::{cdn_key, rank_records};
use crate::settings::ProbeSettings;
use crate::transport;
use async_trait::async_trait;
use netscope_common::{round_to, CdnRecord, NetscopeResult, SENTINEL_MS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, trace};

const EDGE_PORT: u16 = 443;

/// The download may use three quarters of the time left after the
/// connect; the rest keeps it clear of the per-attempt deadline.
const DOWNLOAD_SHARE: (u32, u32) = (3, 4);

/// One connect + download round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdnSample {
    /// TCP connect time
    pub connect: Duration,
    /// Test object download time, `None` when the download failed
    pub download: Option<Duration>,
}

struct EdgeProbe {
    client: reqwest::Client,
    port: u16,
    /// Per-attempt deadline enforced by the prober
    budget: Duration,
}

impl EdgeProbe {
    /// Download window once `spent` of the attempt is used up
    fn download_window(&self, spent: Duration) -> Duration {
        self.budget.saturating_sub(spent) * DOWNLOAD_SHARE.0 / DOWNLOAD_SHARE.1
    }
}

#[async_trait]
impl Probe for EdgeProbe {
    type Target = CdnEndpoint;
    type Sample = CdnSample;

    fn label(target: &CdnEndpoint) -> String {
        target.name.clone()
    }

    async fn attempt(&self, target: &CdnEndpoint, _index: u32) -> NetscopeResult<CdnSample> {
        let started = Instant::now();
        let connect = transport::tcp_connect(&target.host, self.port).await?;
        let window = self.download_window(started.elapsed());
        let download = match transport::within(
            window,
            transport::http_get(&self.client, &target.test_url),
        )
        .await
        {
            Ok(elapsed) => Some(elapsed),
            Err(err) => {
                trace!(cdn = %target.name, error = %err, "download failed");
                None
            }
        };
        Ok(CdnSample { connect, download })
    }
}

/// Runs the CDN family
pub struct CdnTester {
    prober: Prober,
    probe: Arc<EdgeProbe>,
}

impl CdnTester {
    /// Create a tester
    pub fn new(settings: ProbeSettings) -> NetscopeResult<Self> {
        let client = transport::http_client(settings.timeout, true)?;
        Ok(Self {
            prober: Prober::new(settings.clone()),
            probe: Arc::new(EdgeProbe {
                client,
                port: EDGE_PORT,
                budget: settings.timeout,
            }),
        })
    }

    /// Test every edge (the built-in catalog when `endpoints` is empty)
    pub async fn test_all(&self, endpoints: Vec<CdnEndpoint>) -> Vec<CdnRecord> {
        let endpoints = if endpoints.is_empty() {
            cdn_endpoints()
        } else {
            endpoints
        };
        info!(endpoints = endpoints.len(), "starting CDN test");

        let mut records: Vec<_> = self
            .prober
            .run(Arc::clone(&self.probe), &endpoints)
            .await
            .into_iter()
            .map(|(endpoint, samples)| to_record(endpoint, &samples))
            .collect();

        rank_records(&mut records, cdn_key);
        records
    }
}

fn to_record(endpoint: CdnEndpoint, samples: &SampleSet<CdnSample>) -> CdnRecord {
    let connects: Vec<f64> = samples.successes.iter().map(|s| duration_ms(s.connect)).collect();
    let downloads: Vec<f64> = samples
        .successes
        .iter()
        .filter_map(|s| s.download.map(duration_ms))
        .collect();

    let reachable = !connects.is_empty();
    let connect_ms = mean(&connects).map(|v| round_to(v, 2)).unwrap_or(SENTINEL_MS);
    let download_ms = mean(&downloads).map(|v| round_to(v, 2)).unwrap_or(SENTINEL_MS);
    let total_ms = if reachable {
        round_to(connect_ms + download_ms, 2)
    } else {
        SENTINEL_MS
    };

    CdnRecord {
        name: endpoint.name,
        host: endpoint.host,
        connect_ms,
        download_ms,
        total_ms,
        stability_score: stability_score(&connects),
        reachable,
        rank: 0,
    }
}

/// First `n` reachable edges of a ranked report
pub fn best_cdn(records: &[CdnRecord], n: usize) -> Vec<CdnRecord> {
    records.iter().filter(|r| r.reachable).take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn endpoint() -> CdnEndpoint {
        CdnEndpoint {
            name: "Fastly".into(),
            host: "www.fastly.com".into(),
            test_url: "https://www.fastly.com/".into(),
        }
    }

    fn sample(connect_ms: u64, download_ms: Option<u64>) -> CdnSample {
        CdnSample {
            connect: Duration::from_millis(connect_ms),
            download: download_ms.map(Duration::from_millis),
        }
    }

    #[test]
    fn test_total_is_connect_plus_download() {
        let samples = SampleSet {
            successes: vec![sample(10, Some(100)), sample(20, Some(200))],
            failures: 1,
        };
        let record = to_record(endpoint(), &samples);
        assert!(record.reachable);
        assert_eq!(record.connect_ms, 15.0);
        assert_eq!(record.download_ms, 150.0);
        assert_eq!(record.total_ms, 165.0);
    }

    #[test]
    fn test_failed_downloads_keep_connects() {
        let samples = SampleSet {
            successes: vec![sample(30, None), sample(30, None)],
            failures: 0,
        };
        let record = to_record(endpoint(), &samples);
        assert!(record.reachable);
        assert_eq!(record.download_ms, SENTINEL_MS);
        assert_eq!(record.stability_score, 100.0);
    }

    #[test]
    fn test_download_window_leaves_headroom() {
        let edge = EdgeProbe {
            client: reqwest::Client::new(),
            port: EDGE_PORT,
            budget: Duration::from_millis(400),
        };
        assert_eq!(edge.download_window(Duration::ZERO), Duration::from_millis(300));
        assert_eq!(edge.download_window(Duration::from_millis(200)), Duration::from_millis(150));
        assert_eq!(edge.download_window(Duration::from_secs(1)), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_hanging_download_keeps_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let edge_port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        // accepted by the kernel backlog, never answered
        let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let silent_port = silent.local_addr().unwrap().port();

        let mut settings = ProbeSettings::cdn();
        settings.samples = 3;
        settings.timeout = Duration::from_millis(400);
        let tester = EdgeProbe {
            client: transport::http_client(settings.timeout, true).unwrap(),
            port: edge_port,
            budget: settings.timeout,
        };
        let target = CdnEndpoint {
            name: "Local".into(),
            host: "127.0.0.1".into(),
            test_url: format!("http://127.0.0.1:{}/", silent_port),
        };

        let runner = Prober::new(settings);
        let results = runner.run(Arc::new(tester), &[target]).await;
        accept.abort();
        drop(silent);

        let (endpoint, samples) = results.into_iter().next().unwrap();
        assert_eq!(samples.failures, 0);
        assert_eq!(samples.successes.len(), 3);
        assert!(samples.successes.iter().all(|s| s.download.is_none()));

        let record = to_record(endpoint, &samples);
        assert!(record.reachable);
        assert_eq!(record.download_ms, SENTINEL_MS);
        assert!(record.connect_ms < SENTINEL_MS);
    }

    #[test]
    fn test_unreachable_edge() {
        let record = to_record(endpoint(), &SampleSet::default());
        assert!(!record.reachable);
        assert_eq!(record.total_ms, SENTINEL_MS);
        assert_eq!(record.stability_score, 0.0);
    }
}
