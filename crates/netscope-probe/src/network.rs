//! Whole-connection network scan
//!
//! Produces the [`NetworkInfo`] summary consumed by the decision engine
//! plus connection details, latency, throughput and reachability checks.
//! Every part fails soft: a failed lookup is logged and left at its
//! default value.

use crate::aggregate::{duration_ms, stability_score, TimingStats};
use crate::prober::{Probe, Prober};
use crate::settings::ProbeSettings;
use crate::transport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use netscope_common::{round_to, NetscopeResult, NetworkInfo};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{info, warn};

const REFERENCE_HOST: &str = "8.8.8.8";
const IPINFO_URL: &str = "https://ipinfo.io/json";
const IPIFY_URL: &str = "https://api.ipify.org?format=json";
const THROUGHPUT_URLS: &[&str] = &[
    "https://speed.cloudflare.com/__down?bytes=1000000",
    "https://proof.ovh.net/files/1Mb.dat",
];
const STABILITY_SAMPLES: u32 = 20;
const MTU_RANGE: (u32, u32) = (500, 1500);
const MTU_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const THROUGHPUT_TIMEOUT: Duration = Duration::from_secs(15);
const NAT_PROBE_PORTS: [u16; 3] = [10000, 10001, 10002];

/// NAT classification labels
pub mod nat {
    /// Local and public address match
    pub const NONE: &str = "No NAT (Public IP)";
    /// Local ports bind freely
    pub const FULL_CONE: &str = "Full Cone NAT";
    /// Local ports could not be bound
    pub const SYMMETRIC: &str = "Symmetric / Restricted NAT";
    /// Detection failed
    pub const UNKNOWN: &str = "Unknown";
}

/// Addressing and ISP details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionInfo {
    /// Address seen by the internet
    pub public_ip: String,
    /// Address of the outbound interface
    pub local_ip: String,
    /// Provider
    pub isp: String,
    /// Country code
    pub country: String,
    /// City
    pub city: String,
    /// Organisation / ASN
    pub org: String,
    /// IANA timezone
    pub timezone: String,
}

/// Latency to the reference host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Probed host
    pub host: String,
    /// Fastest sample
    pub min_ms: f64,
    /// Slowest sample
    pub max_ms: f64,
    /// Mean sample
    pub avg_ms: f64,
    /// Consecutive-sample jitter
    pub jitter_ms: f64,
    /// Failed attempts (0-100)
    pub packet_loss_pct: f64,
    /// Attempts made
    pub samples: u32,
}

/// Download throughput estimate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    /// Megabits per second
    pub download_mbps: f64,
    /// Not measured, always 0
    pub upload_mbps: f64,
    /// Download wall time in seconds
    pub test_duration_s: f64,
}

/// Full scan result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkScan {
    /// Addressing and ISP
    pub connection_info: ConnectionInfo,
    /// Reference latency
    pub latency: LatencySummary,
    /// Download estimate
    pub throughput: Throughput,
    /// Detected MTU
    pub mtu: u32,
    /// NAT classification
    pub nat_type: String,
    /// Connection stability (0-100)
    pub stability_score: f64,
    /// TCP 53 reachable
    pub tcp_accessible: bool,
    /// UDP 53 send succeeded
    pub udp_accessible: bool,
    /// Scan start
    pub timestamp: DateTime<Utc>,
}

impl NetworkScan {
    /// Summary fed to the decision engine
    pub fn info(&self) -> NetworkInfo {
        NetworkInfo::new(self.mtu, self.stability_score, self.nat_type.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpInfo {
    ip: String,
    org: String,
    country: String,
    city: String,
    timezone: String,
}

struct ReachProbe {
    port: u16,
}

#[async_trait]
impl Probe for ReachProbe {
    type Target = String;
    type Sample = Duration;

    fn label(target: &String) -> String {
        target.clone()
    }

    async fn attempt(&self, target: &String, _index: u32) -> NetscopeResult<Duration> {
        transport::tcp_connect(target, self.port).await
    }
}

/// Runs the whole-connection scan
pub struct NetworkScanner {
    settings: ProbeSettings,
    client: Option<reqwest::Client>,
}

impl NetworkScanner {
    /// Create a scanner
    pub fn new(settings: ProbeSettings) -> Self {
        let client = match transport::http_client(settings.timeout, true) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!(error = %err, "HTTP client unavailable, lookups disabled");
                None
            }
        };
        Self { settings, client }
    }

    /// Run every check
    pub async fn full_scan(&self) -> NetworkScan {
        let timestamp = Utc::now();
        info!("starting network scan");

        let connection_info = self.connection_info().await;
        let latency = self.latency(REFERENCE_HOST).await;
        let mtu = self.detect_mtu().await;
        let nat_type = self.detect_nat_type().await.to_string();
        let tcp_accessible = self.tcp_accessible(REFERENCE_HOST, 53).await;
        let udp_accessible = self.udp_accessible(REFERENCE_HOST, 53).await;
        let stability_score = self.stability(REFERENCE_HOST).await;
        let throughput = self.throughput().await;

        info!(mtu, nat = %nat_type, stability = stability_score, "network scan complete");

        NetworkScan {
            connection_info,
            latency,
            throughput,
            mtu,
            nat_type,
            stability_score,
            tcp_accessible,
            udp_accessible,
            timestamp,
        }
    }

    /// Local and public addressing
    pub async fn connection_info(&self) -> ConnectionInfo {
        let mut info = ConnectionInfo::default();

        match transport::local_ip().await {
            Ok(ip) => info.local_ip = ip.to_string(),
            Err(err) => warn!(error = %err, "could not detect local IP"),
        }

        match self.fetch_json::<IpInfo>(IPINFO_URL).await {
            Ok(data) => {
                info.public_ip = data.ip;
                info.isp = data.org.clone();
                info.country = data.country;
                info.city = data.city;
                info.org = data.org;
                info.timezone = data.timezone;
            }
            Err(err) => {
                warn!(error = %err, "could not detect public IP");
                if let Ok(data) = self.fetch_json::<IpInfo>(IPIFY_URL).await {
                    info.public_ip = data.ip;
                }
            }
        }

        info
    }

    /// TCP connect latency to `host:80`
    pub async fn latency(&self, host: &str) -> LatencySummary {
        let prober = Prober::new(self.settings.clone());
        let samples = prober.sample(&ReachProbe { port: 80 }, &host.to_string()).await;
        let stats = TimingStats::from_set(&samples);

        let mut summary = LatencySummary {
            host: host.to_string(),
            samples: stats.attempts,
            packet_loss_pct: stats.packet_loss_pct(),
            ..Default::default()
        };
        if stats.reachable() {
            summary.min_ms = stats.min_ms;
            summary.max_ms = stats.max_ms;
            summary.avg_ms = stats.avg_ms;
            summary.jitter_ms = stats.jitter_ms;
        }
        summary
    }

    /// Largest payload size accepted by a TCP send to the reference host
    pub async fn detect_mtu(&self) -> u32 {
        search_mtu(MTU_RANGE.0, MTU_RANGE.1, |size| async move {
            transport::within(
                MTU_PROBE_TIMEOUT,
                transport::tcp_send_payload(REFERENCE_HOST, 53, size as usize),
            )
            .await
            .is_ok()
        })
        .await
    }

    /// NAT heuristic from address comparison and local port binding
    pub async fn detect_nat_type(&self) -> &'static str {
        let local = match transport::local_ip().await {
            Ok(ip) => ip,
            Err(_) => return nat::UNKNOWN,
        };
        let public = match self.fetch_json::<IpInfo>(IPIFY_URL).await {
            Ok(data) => data.ip,
            Err(_) => return nat::UNKNOWN,
        };

        let mut bindable = 0;
        for port in NAT_PROBE_PORTS {
            if tokio::net::UdpSocket::bind((local, port)).await.is_ok() {
                bindable += 1;
            }
        }
        classify_nat(local, &public, bindable)
    }

    /// Whether a TCP connect succeeds
    pub async fn tcp_accessible(&self, host: &str, port: u16) -> bool {
        transport::within(self.settings.timeout, transport::tcp_connect(host, port))
            .await
            .is_ok()
    }

    /// Whether a datagram can be sent
    pub async fn udp_accessible(&self, host: &str, port: u16) -> bool {
        transport::within(self.settings.timeout, transport::udp_send(host, port))
            .await
            .is_ok()
    }

    /// Stability over repeated connects; a failure counts as the full timeout
    pub async fn stability(&self, host: &str) -> f64 {
        let pause = if self.settings.restricted {
            Duration::from_millis(300)
        } else {
            Duration::from_millis(100)
        };
        let mut samples = Vec::with_capacity(STABILITY_SAMPLES as usize);

        for _ in 0..STABILITY_SAMPLES {
            let outcome = transport::within(self.settings.timeout, transport::tcp_connect(host, 80))
                .await
                .ok()
                .map(duration_ms);
            samples.push(outcome);
            tokio::time::sleep(pause).await;
        }

        padded_stability(&samples, duration_ms(self.settings.timeout))
    }

    /// Download throughput from the first test URL that works
    pub async fn throughput(&self) -> Throughput {
        let client = match transport::http_client(THROUGHPUT_TIMEOUT, true) {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "throughput test skipped");
                return Throughput::default();
            }
        };

        for url in THROUGHPUT_URLS {
            match transport::download(&client, url).await {
                Ok((bytes, elapsed)) => {
                    let secs = elapsed.as_secs_f64();
                    return Throughput {
                        download_mbps: mbps(bytes, elapsed),
                        upload_mbps: 0.0,
                        test_duration_s: round_to(secs, 2),
                    };
                }
                Err(err) => warn!(url, error = %err, "throughput test failed"),
            }
        }
        Throughput::default()
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> NetscopeResult<T> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| netscope_common::NetscopeError::Http("no HTTP client".into()))?;
        let response = client.get(url).send().await.map_err(transport::http_error)?;
        response.json::<T>().await.map_err(transport::http_error)
    }
}

/// Binary search for the largest size in `[low, high]` that `accepts`.
///
/// Returns `low` when nothing is accepted.
pub async fn search_mtu<F, Fut>(mut low: u32, mut high: u32, accepts: F) -> u32
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut best = low;
    while low <= high {
        let mid = low + (high - low) / 2;
        if accepts(mid).await {
            best = mid;
            low = mid + 1;
        } else if mid == 0 {
            break;
        } else {
            high = mid - 1;
        }
    }
    best
}

/// NAT label from addresses and the number of bindable probe ports
pub fn classify_nat(local: IpAddr, public: &str, bindable: usize) -> &'static str {
    if local.to_string() == public {
        nat::NONE
    } else if bindable >= 2 {
        nat::FULL_CONE
    } else {
        nat::SYMMETRIC
    }
}

/// Stability with failed samples counted as `timeout_ms`
pub fn padded_stability(samples: &[Option<f64>], timeout_ms: f64) -> f64 {
    let padded: Vec<f64> = samples.iter().map(|s| s.unwrap_or(timeout_ms)).collect();
    stability_score(&padded)
}

/// Megabits per second, 2 decimals
pub fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    round_to(bytes as f64 * 8.0 / (secs * 1_000_000.0), 2)
}
