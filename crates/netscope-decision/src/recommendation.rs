//! Recommendation generator
//!
//! Families are evaluated in a fixed order (location, dns, cdn, protocol,
//! ports, network) and the combined list is stably sorted by priority,
//! then by descending confidence.

use netscope_common::{
    CdnRecord, DecisionInput, DnsRecord, LocationRecord, NetworkInfo, PortRecord, ProtocolRecord,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Protocols at or below this success rate are not considered working
const WORKING_SUCCESS_RATE: f64 = 50.0;

/// Ports above this stability belong to the stable range
const STABLE_PORT_SCORE: f64 = 70.0;

/// Largest stable port list shown
const STABLE_PORT_LIMIT: usize = 10;

/// Area a recommendation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Server location
    Location,
    /// Resolver choice
    #[serde(rename = "DNS")]
    Dns,
    /// CDN choice
    #[serde(rename = "CDN")]
    Cdn,
    /// Protocol choice
    Protocol,
    /// Port choice
    Ports,
    /// Whole-connection tuning
    Network,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Location => "Location",
            Category::Dns => "DNS",
            Category::Cdn => "CDN",
            Category::Protocol => "Protocol",
            Category::Ports => "Ports",
            Category::Network => "Network",
        };
        f.write_str(name)
    }
}

/// One actionable recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Area
    pub category: Category,
    /// Short heading
    pub title: String,
    /// Recommended value
    pub value: String,
    /// Explanation
    pub detail: String,
    /// Confidence (0-100)
    pub confidence: f64,
    /// Lower is more important
    pub priority: u8,
}

impl Recommendation {
    fn new(
        category: Category,
        title: &str,
        value: impl Into<String>,
        detail: impl Into<String>,
        confidence: f64,
        priority: u8,
    ) -> Self {
        Self {
            category,
            title: title.to_string(),
            value: value.into(),
            detail: detail.into(),
            confidence: clamp_confidence(confidence),
            priority,
        }
    }
}

#[inline]
fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 100.0)
    }
}

/// Produces recommendations from a [`DecisionInput`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    /// Create an engine
    pub fn new() -> Self {
        Self
    }

    /// Every applicable recommendation, most important first
    pub fn generate(&self, input: &DecisionInput) -> Vec<Recommendation> {
        let mut recs = Vec::new();

        if let Some(records) = input.location() {
            recs.extend(location_recs(records));
        }
        if let Some(records) = input.dns() {
            recs.extend(dns_recs(records));
        }
        if let Some(records) = input.cdn() {
            recs.extend(cdn_recs(records));
        }
        if let Some(records) = input.protocol() {
            recs.extend(protocol_recs(records));
        }
        if let Some(records) = input.ports() {
            recs.extend(port_recs(records));
        }
        if let Some(network) = input.network() {
            recs.extend(network_recs(network));
        }

        recs.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });
        debug!(count = recs.len(), "recommendations generated");
        recs
    }
}

fn location_recs(records: &[LocationRecord]) -> Vec<Recommendation> {
    let reachable: Vec<&LocationRecord> = records.iter().filter(|r| r.reachable).collect();
    let Some(best) = reachable.first() else {
        return vec![Recommendation::new(
            Category::Location,
            "No reachable servers",
            "N/A",
            "Could not reach any global test endpoints. Network may be severely restricted.",
            90.0,
            1,
        )];
    };

    let mut recs = vec![Recommendation::new(
        Category::Location,
        "Best Server Location",
        format!("{}, {}", best.city, best.country),
        format!(
            "Lowest latency: {}ms to {}. Recommended for VPS/VPN endpoint.",
            best.avg_ms, best.host
        ),
        (100.0 - best.packet_loss_pct).min(95.0),
        1,
    )];

    // regions in first-seen order so ties keep report order
    let mut regions: Vec<(&str, Vec<f64>)> = Vec::new();
    for record in &reachable {
        match regions.iter_mut().find(|(name, _)| *name == record.region) {
            Some((_, latencies)) => latencies.push(record.avg_ms),
            None => regions.push((record.region.as_str(), vec![record.avg_ms])),
        }
    }

    let mut best_region: Option<(&str, f64, usize)> = None;
    for (name, latencies) in &regions {
        let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
        if best_region.map_or(true, |(_, best_avg, _)| avg < best_avg) {
            best_region = Some((*name, avg, latencies.len()));
        }
    }

    if let Some((name, avg, count)) = best_region {
        recs.push(Recommendation::new(
            Category::Location,
            "Best Region",
            name,
            format!(
                "Average latency {}ms across {} endpoints.",
                netscope_common::round_to(avg, 1),
                count
            ),
            85.0,
            2,
        ));
    }

    recs
}

fn dns_recs(records: &[DnsRecord]) -> Vec<Recommendation> {
    let reachable: Vec<&DnsRecord> = records.iter().filter(|r| r.reachable).collect();
    let mut recs = Vec::new();

    if let Some(best) = reachable.first() {
        recs.push(Recommendation::new(
            Category::Dns,
            "Best DNS Server",
            format!("{} ({})", best.name, best.ip),
            format!(
                "Average response: {}ms, reliability: {}%.",
                best.avg_ms, best.reliability_pct
            ),
            best.reliability_pct,
            1,
        ));
    }
    if let Some(second) = reachable.get(1) {
        recs.push(Recommendation::new(
            Category::Dns,
            "Secondary DNS",
            format!("{} ({})", second.name, second.ip),
            format!("Average response: {}ms. Use as fallback.", second.avg_ms),
            second.reliability_pct,
            3,
        ));
    }

    recs
}

fn cdn_recs(records: &[CdnRecord]) -> Vec<Recommendation> {
    records
        .iter()
        .find(|r| r.reachable)
        .map(|best| {
            Recommendation::new(
                Category::Cdn,
                "Best CDN",
                best.name.clone(),
                format!(
                    "Total latency: {}ms, stability: {}%.",
                    best.total_ms, best.stability_score
                ),
                best.stability_score,
                2,
            )
        })
        .into_iter()
        .collect()
}

fn protocol_recs(records: &[ProtocolRecord]) -> Vec<Recommendation> {
    let working: Vec<&ProtocolRecord> = records
        .iter()
        .filter(|r| r.success_rate > WORKING_SUCCESS_RATE)
        .collect();

    // first minimum wins on ties
    let Some(best) = working.iter().copied().reduce(|best, r| {
        if r.avg_ms < best.avg_ms {
            r
        } else {
            best
        }
    }) else {
        return Vec::new();
    };

    let mut recs = vec![Recommendation::new(
        Category::Protocol,
        "Best Protocol",
        best.protocol.clone(),
        format!(
            "Average latency: {}ms, success rate: {}%.",
            best.avg_ms, best.success_rate
        ),
        best.success_rate,
        2,
    )];

    if let Some(tls) = working.iter().find(|r| r.protocol.contains("TLS")) {
        let verdict = if tls.avg_ms < 500.0 {
            "Good"
        } else {
            "Consider optimisation"
        };
        recs.push(Recommendation::new(
            Category::Protocol,
            "TLS Performance",
            format!("{}ms handshake", tls.avg_ms),
            format!("TLS handshake average: {}ms. {}.", tls.avg_ms, verdict),
            80.0,
            3,
        ));
    }

    recs
}

fn port_recs(records: &[PortRecord]) -> Vec<Recommendation> {
    let reachable: Vec<&PortRecord> = records.iter().filter(|r| r.reachable).collect();
    let Some(best) = reachable.first() else {
        return vec![Recommendation::new(
            Category::Ports,
            "No Reachable Ports",
            "N/A",
            "No outbound ports are reachable. Network is severely restricted.",
            95.0,
            1,
        )];
    };

    let mut recs = vec![Recommendation::new(
        Category::Ports,
        "Best Port",
        format!("{} ({})", best.port, best.service),
        format!(
            "Latency: {}ms, stability: {}%.",
            best.avg_ms, best.stability_score
        ),
        best.stability_score,
        2,
    )];

    let mut stable: Vec<u16> = reachable
        .iter()
        .filter(|r| r.stability_score > STABLE_PORT_SCORE)
        .map(|r| r.port)
        .collect();
    if !stable.is_empty() {
        let count = stable.len();
        stable.sort_unstable();
        let listed: Vec<String> = stable
            .iter()
            .take(STABLE_PORT_LIMIT)
            .map(u16::to_string)
            .collect();
        recs.push(Recommendation::new(
            Category::Ports,
            "Stable Port Range",
            listed.join(", "),
            format!("{count} ports with >70% stability score."),
            75.0,
            3,
        ));
    }

    recs
}

fn network_recs(network: &NetworkInfo) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if let Some(mtu) = network.mtu.filter(|mtu| *mtu > 0) {
        let payload = mtu.saturating_sub(28);
        recs.push(Recommendation::new(
            Category::Network,
            "Recommended MTU",
            payload.to_string(),
            format!(
                "Detected MTU: {mtu}. Recommended payload MTU: {payload} to avoid fragmentation."
            ),
            80.0,
            3,
        ));
    }

    let stability = network.stability_score.unwrap_or(0.0);
    if stability < 50.0 {
        recs.push(Recommendation::new(
            Category::Network,
            "Connection Stability Warning",
            format!("{stability}%"),
            "Connection stability is low. Consider multiplexing and aggressive retry strategies.",
            90.0,
            1,
        ));
    }

    if let Some(nat) = network.nat_type.as_deref().filter(|nat| nat.contains("Symmetric")) {
        recs.push(Recommendation::new(
            Category::Network,
            "NAT Type Alert",
            nat,
            "Symmetric NAT detected. May limit P2P and some VPN protocols.",
            75.0,
            2,
        ));
    }

    recs
}
