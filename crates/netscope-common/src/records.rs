//! Per-family measurement records
//!
//! Field names are part of the wire contract with the request layer and
//! must not be renamed. Every record deserializes with missing fields
//! defaulted so partial payloads from callers are accepted.

use crate::{Ranked, SENTINEL_MS};
use serde::{Deserialize, Serialize};

/// Global latency target result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRecord {
    /// Probed host
    pub host: String,
    /// ISO-ish country code
    pub country: String,
    /// Continental region
    pub region: String,
    /// City name
    pub city: String,
    /// Mean connect time
    pub avg_ms: f64,
    /// Fastest connect time
    pub min_ms: f64,
    /// Slowest connect time
    pub max_ms: f64,
    /// Mean absolute difference between consecutive samples
    pub jitter_ms: f64,
    /// Share of failed attempts (0-100)
    pub packet_loss_pct: f64,
    /// At least one attempt succeeded
    pub reachable: bool,
    /// Timing consistency (0-100)
    pub stability_score: f64,
    /// 1-based rank within the report
    pub rank: u32,
}

impl Default for LocationRecord {
    fn default() -> Self {
        Self {
            host: String::new(),
            country: String::new(),
            region: String::new(),
            city: String::new(),
            avg_ms: SENTINEL_MS,
            min_ms: SENTINEL_MS,
            max_ms: SENTINEL_MS,
            jitter_ms: 0.0,
            packet_loss_pct: 0.0,
            reachable: false,
            stability_score: 0.0,
            rank: 0,
        }
    }
}

/// DNS resolver benchmark result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsRecord {
    /// Resolver display name
    pub name: String,
    /// Resolver address
    pub ip: String,
    /// Mean query round trip
    pub avg_ms: f64,
    /// Fastest query
    pub min_ms: f64,
    /// Slowest query
    pub max_ms: f64,
    /// Share of answered queries (0-100)
    pub reliability_pct: f64,
    /// Unanswered queries
    pub error_count: u32,
    /// Queries sent
    pub total_queries: u32,
    /// At least one query answered
    pub reachable: bool,
    /// Timing consistency (0-100)
    pub stability_score: f64,
    /// 1-based rank within the report
    pub rank: u32,
}

impl Default for DnsRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            ip: String::new(),
            avg_ms: SENTINEL_MS,
            min_ms: SENTINEL_MS,
            max_ms: SENTINEL_MS,
            reliability_pct: 0.0,
            error_count: 0,
            total_queries: 0,
            reachable: false,
            stability_score: 0.0,
            rank: 0,
        }
    }
}

/// CDN edge result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnRecord {
    /// CDN display name
    pub name: String,
    /// Edge host
    pub host: String,
    /// Mean TCP connect time to port 443
    pub connect_ms: f64,
    /// Mean test object download time
    pub download_ms: f64,
    /// `connect_ms + download_ms`
    pub total_ms: f64,
    /// Connect timing consistency (0-100)
    pub stability_score: f64,
    /// At least one connect succeeded
    pub reachable: bool,
    /// 1-based rank within the report
    pub rank: u32,
}

impl Default for CdnRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: String::new(),
            connect_ms: SENTINEL_MS,
            download_ms: SENTINEL_MS,
            total_ms: SENTINEL_MS,
            stability_score: 0.0,
            reachable: false,
            rank: 0,
        }
    }
}

/// Per-protocol summary across all protocol targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolRecord {
    /// Protocol label, e.g. `"HTTPS"` or `"TLS Handshake"`
    pub protocol: String,
    /// Mean time over targets that answered
    pub avg_ms: f64,
    /// Fastest target minimum
    pub min_ms: f64,
    /// Slowest target maximum
    pub max_ms: f64,
    /// Mean success rate over targets that answered (0-100)
    pub success_rate: f64,
    /// Targets this protocol was tried against
    pub targets_tested: u32,
    /// 1-based rank within the report
    pub rank: u32,
}

impl Default for ProtocolRecord {
    fn default() -> Self {
        Self {
            protocol: String::new(),
            avg_ms: SENTINEL_MS,
            min_ms: SENTINEL_MS,
            max_ms: SENTINEL_MS,
            success_rate: 0.0,
            targets_tested: 0,
            rank: 0,
        }
    }
}

/// Outbound port reachability result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortRecord {
    /// Destination port
    pub port: u16,
    /// Well-known service name
    pub service: String,
    /// Transport label from the catalog
    pub protocol: String,
    /// At least one connect succeeded
    pub reachable: bool,
    /// Mean connect time
    pub avg_ms: f64,
    /// Timing consistency (0-100)
    pub stability_score: f64,
    /// 1-based rank within the report
    pub rank: u32,
}

impl Default for PortRecord {
    fn default() -> Self {
        Self {
            port: 0,
            service: String::new(),
            protocol: "TCP".into(),
            reachable: false,
            avg_ms: SENTINEL_MS,
            stability_score: 0.0,
            rank: 0,
        }
    }
}

macro_rules! impl_ranked {
    ($($record:ty),+ $(,)?) => {
        $(
            impl Ranked for $record {
                #[inline]
                fn reachable(&self) -> bool {
                    self.reachable
                }

                #[inline]
                fn rank(&self) -> u32 {
                    self.rank
                }

                #[inline]
                fn set_rank(&mut self, rank: u32) {
                    self.rank = rank;
                }
            }
        )+
    };
}

impl_ranked!(LocationRecord, DnsRecord, CdnRecord, PortRecord);

impl Ranked for ProtocolRecord {
    /// Protocol summaries carry no flag; the sentinel marks "no target answered".
    #[inline]
    fn reachable(&self) -> bool {
        self.avg_ms < SENTINEL_MS
    }

    #[inline]
    fn rank(&self) -> u32 {
        self.rank
    }

    #[inline]
    fn set_rank(&mut self, rank: u32) {
        self.rank = rank;
    }
}
