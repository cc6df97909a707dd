//! Connection architecture builder
//!
//! Each of the nine plan fields is derived independently from the inputs
//! it needs. A field whose inputs are missing falls back to a fixed
//! default.

use netscope_common::{
    CdnRecord, DecisionInput, DnsRecord, LocationRecord, PortRecord, ProtocolRecord,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ports tried first, in order, when building port/protocol combinations
const PREFERRED_PORTS: [u16; 6] = [443, 80, 8443, 8080, 2083, 2096];

/// Ports that carry TLS
const TLS_PORTS: [u16; 4] = [443, 8443, 2083, 2096];

/// Largest number of port/protocol combinations returned
const MAX_COMBOS: usize = 5;

/// A decision expressed as a type name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedChoice {
    /// Chosen type
    #[serde(rename = "type")]
    pub kind: String,
    /// Explanation
    pub detail: String,
    /// Confidence (0-100)
    pub confidence: f64,
}

impl TypedChoice {
    fn new(kind: &str, detail: &str, confidence: f64) -> Self {
        Self {
            kind: kind.to_string(),
            detail: detail.to_string(),
            confidence,
        }
    }
}

/// A decision expressed as a category name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryChoice {
    /// Chosen category
    pub category: String,
    /// Explanation
    pub detail: String,
    /// Confidence (0-100)
    pub confidence: f64,
}

impl CategoryChoice {
    fn new(category: impl Into<String>, detail: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: category.into(),
            detail: detail.into(),
            confidence,
        }
    }
}

/// A port and the protocol to run over it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortCombo {
    /// Port
    pub port: u16,
    /// `"TLS/TCP"` or `"TCP"`
    pub protocol: String,
    /// Service name from the port report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Measured connect latency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// Measured stability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    /// Confidence (0-100)
    pub confidence: f64,
}

/// One step of the fallback plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackLevel {
    /// 1-based level
    pub level: u32,
    /// What to try
    pub strategy: String,
    /// Explanation
    pub detail: String,
}

/// Preferred server location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerLocation {
    /// `"City, Country"` or a default label
    pub location: String,
    /// Latency to the chosen location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// Confidence (0-100)
    pub confidence: f64,
}

/// Resolver pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Primary resolver address
    pub primary: String,
    /// Primary resolver name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_name: Option<String>,
    /// Secondary resolver address
    pub secondary: String,
    /// Secondary resolver name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
    /// Confidence (0-100)
    pub confidence: f64,
}

/// CDN usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdnStrategy {
    /// Strategy sentence
    pub strategy: String,
    /// Connect plus download latency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    /// Connect stability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
    /// Confidence (0-100)
    pub confidence: f64,
}

/// Complete connection architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturePlan {
    /// How connections are arranged
    pub connection_type: TypedChoice,
    /// Transport protocol
    pub transport: TypedChoice,
    /// Encryption profile
    pub encryption: CategoryChoice,
    /// Tunnel style
    pub tunnel_category: CategoryChoice,
    /// Ordered port/protocol combinations
    pub port_protocol_combo: Vec<PortCombo>,
    /// Ordered fallback levels
    pub fallback_plan: Vec<FallbackLevel>,
    /// Where to place the server
    pub server_location: ServerLocation,
    /// Resolvers
    pub dns_config: DnsConfig,
    /// CDN usage
    pub cdn_strategy: CdnStrategy,
}

impl Default for ArchitecturePlan {
    fn default() -> Self {
        ArchitectureBuilder::new().build(&DecisionInput::empty())
    }
}

type ConnectionRule = fn(&DecisionInput) -> Option<TypedChoice>;

/// Connection-type rules in evaluation order; the last match wins.
const CONNECTION_RULES: &[(&str, ConnectionRule)] = &[
    ("network stability", stability_rule),
    ("https health", https_rule),
];

fn stability_rule(input: &DecisionInput) -> Option<TypedChoice> {
    let stability = input.network()?.stability_score.unwrap_or(50.0);
    if stability < 40.0 {
        Some(TypedChoice::new(
            "Multiplexed Tunnel with Redundancy",
            "Low stability detected. Use multiplexed connections with automatic failover.",
            85.0,
        ))
    } else if stability > 80.0 {
        Some(TypedChoice::new(
            "Direct Single Connection",
            "High stability. Simple direct connection is sufficient.",
            90.0,
        ))
    } else {
        None
    }
}

fn https_rule(input: &DecisionInput) -> Option<TypedChoice> {
    let https = input.protocol()?.iter().find(|p| p.protocol == "HTTPS")?;
    (https.success_rate < 50.0).then(|| {
        TypedChoice::new(
            "Obfuscated Transport",
            "HTTPS has low success rate. Consider obfuscated or CDN-fronted transport.",
            80.0,
        )
    })
}

/// Builds an [`ArchitecturePlan`] from a [`DecisionInput`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchitectureBuilder;

impl ArchitectureBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self
    }

    /// Derive every plan field
    pub fn build(&self, input: &DecisionInput) -> ArchitecturePlan {
        let protocols = input.protocol();
        let ports = input.ports();

        ArchitecturePlan {
            connection_type: connection_type(input),
            transport: transport(protocols),
            encryption: encryption(protocols),
            tunnel_category: tunnel_category(ports),
            port_protocol_combo: port_protocol_combos(ports),
            fallback_plan: fallback_plan(ports),
            server_location: server_location(input.location()),
            dns_config: dns_config(input.dns()),
            cdn_strategy: cdn_strategy(input.cdn()),
        }
    }
}

fn connection_type(input: &DecisionInput) -> TypedChoice {
    let mut choice = TypedChoice::new(
        "Direct Encrypted Tunnel",
        "Standard encrypted tunnel with TLS-based transport",
        70.0,
    );
    for (name, rule) in CONNECTION_RULES {
        if let Some(next) = rule(input) {
            debug!(rule = name, choice = %next.kind, "connection rule matched");
            choice = next;
        }
    }
    choice
}

fn first_rate(protocols: &[ProtocolRecord], matches: impl Fn(&str) -> bool) -> Option<f64> {
    protocols
        .iter()
        .find(|p| matches(&p.protocol))
        .map(|p| p.success_rate)
}

fn transport(protocols: Option<&[ProtocolRecord]>) -> TypedChoice {
    let Some(protocols) = protocols else {
        return TypedChoice::new("TCP/TLS", "Default recommendation", 60.0);
    };

    let healthy = |rate: Option<f64>| rate.is_some_and(|r| r > 70.0);
    let tcp_ok = healthy(first_rate(protocols, |p| p == "TCP"));
    let udp_ok = healthy(first_rate(protocols, |p| p == "UDP"));
    let ws_ok = healthy(first_rate(protocols, |p| p.contains("WebSocket")));

    if ws_ok && tcp_ok {
        TypedChoice::new(
            "WebSocket over TLS",
            "Both TCP and WebSocket performing well. WebSocket over TLS recommended for flexibility.",
            85.0,
        )
    } else if tcp_ok && !udp_ok {
        TypedChoice::new(
            "TCP/TLS",
            "TCP is reliable but UDP is restricted. Use TCP-based transport.",
            80.0,
        )
    } else if udp_ok {
        TypedChoice::new(
            "UDP-based (QUIC-like)",
            "UDP is available and performing well. Consider QUIC or UDP-based transport for lower latency.",
            75.0,
        )
    } else {
        TypedChoice::new(
            "TCP/TLS with CDN fronting",
            "Limited protocol availability. Use CDN-fronted TCP for reliability.",
            70.0,
        )
    }
}

fn encryption(protocols: Option<&[ProtocolRecord]>) -> CategoryChoice {
    let slow_tls = protocols
        .and_then(|p| p.iter().find(|r| r.protocol.contains("TLS")))
        .is_some_and(|tls| tls.avg_ms > 1000.0);

    if slow_tls {
        CategoryChoice::new(
            "TLS 1.3 with session resumption",
            "TLS handshake is slow. Use session resumption (0-RTT) to reduce overhead.",
            80.0,
        )
    } else {
        CategoryChoice::new(
            "TLS 1.3",
            "Modern TLS 1.3 recommended for best security and performance.",
            85.0,
        )
    }
}

fn reachable_ports(ports: &[PortRecord]) -> impl Iterator<Item = &PortRecord> {
    ports.iter().filter(|p| p.reachable)
}

fn first_alternative(ports: &[PortRecord]) -> Option<&PortRecord> {
    reachable_ports(ports).find(|p| p.port != 80 && p.port != 443)
}

fn tunnel_category(ports: Option<&[PortRecord]>) -> CategoryChoice {
    let Some(ports) = ports else {
        return CategoryChoice::new(
            "HTTPS-based Tunnel",
            "Default: tunnel over HTTPS (port 443)",
            65.0,
        );
    };

    if reachable_ports(ports).any(|p| p.port == 443) {
        CategoryChoice::new(
            "TLS-based Tunnel (port 443)",
            "Port 443 is available and stable. Standard TLS tunnel recommended.",
            90.0,
        )
    } else if reachable_ports(ports).any(|p| p.port == 80) {
        CategoryChoice::new(
            "HTTP-wrapped Tunnel (port 80)",
            "Port 443 may be restricted. Use HTTP-based tunnel with internal encryption.",
            75.0,
        )
    } else if let Some(alt) = first_alternative(ports) {
        CategoryChoice::new(
            format!("Alternative Port Tunnel (port {})", alt.port),
            format!(
                "Standard ports restricted. Use port {} ({}).",
                alt.port, alt.service
            ),
            65.0,
        )
    } else {
        CategoryChoice::new(
            "CDN-fronted Tunnel",
            "Most ports restricted. Use CDN fronting for connectivity.",
            60.0,
        )
    }
}

fn port_protocol_combos(ports: Option<&[PortRecord]>) -> Vec<PortCombo> {
    let Some(ports) = ports else {
        return vec![PortCombo {
            port: 443,
            protocol: "TLS/TCP".into(),
            service: None,
            latency_ms: None,
            stability: None,
            confidence: 70.0,
        }];
    };

    let preference = |port: u16| {
        PREFERRED_PORTS
            .iter()
            .position(|p| *p == port)
            .unwrap_or(999)
    };

    let mut candidates: Vec<&PortRecord> = reachable_ports(ports).collect();
    candidates.sort_by(|a, b| {
        preference(a.port)
            .cmp(&preference(b.port))
            .then_with(|| a.avg_ms.total_cmp(&b.avg_ms))
    });

    candidates
        .into_iter()
        .take(MAX_COMBOS)
        .map(|p| PortCombo {
            port: p.port,
            protocol: if TLS_PORTS.contains(&p.port) { "TLS/TCP" } else { "TCP" }.into(),
            service: Some(p.service.clone()),
            latency_ms: Some(p.avg_ms),
            stability: Some(p.stability_score),
            confidence: p.stability_score.min(90.0),
        })
        .collect()
}

fn fallback_plan(ports: Option<&[PortRecord]>) -> Vec<FallbackLevel> {
    let mut plan = vec![
        FallbackLevel {
            level: 1,
            strategy: "Primary: TLS tunnel on port 443".into(),
            detail: "Standard encrypted connection.".into(),
        },
        FallbackLevel {
            level: 2,
            strategy: "Fallback 1: WebSocket over TLS on port 443".into(),
            detail: "If direct TLS fails, wrap traffic in WebSocket.".into(),
        },
        FallbackLevel {
            level: 3,
            strategy: "Fallback 2: CDN-fronted connection".into(),
            detail: "Route through CDN edge to bypass path restrictions.".into(),
        },
    ];

    if let Some(alt) = ports.and_then(first_alternative) {
        plan.push(FallbackLevel {
            level: 4,
            strategy: format!("Fallback 3: Alternative port {}", alt.port),
            detail: format!("Use non-standard port {} ({}).", alt.port, alt.service),
        });
    }

    plan.push(FallbackLevel {
        level: plan.len() as u32 + 1,
        strategy: "Last resort: Fragment + obfuscate on any available port".into(),
        detail: "Maximum obfuscation with fragmented packets.".into(),
    });

    plan
}

fn server_location(records: Option<&[LocationRecord]>) -> ServerLocation {
    let Some(records) = records else {
        return ServerLocation {
            location: "Europe (default)".into(),
            latency_ms: None,
            confidence: 50.0,
        };
    };

    match records.iter().find(|r| r.reachable) {
        Some(best) => ServerLocation {
            location: format!("{}, {}", best.city, best.country),
            latency_ms: Some(best.avg_ms),
            confidence: (100.0 - best.packet_loss_pct).clamp(0.0, 95.0),
        },
        None => ServerLocation {
            location: "Unknown".into(),
            latency_ms: None,
            confidence: 20.0,
        },
    }
}

fn default_dns(confidence: f64) -> DnsConfig {
    DnsConfig {
        primary: "1.1.1.1".into(),
        primary_name: None,
        secondary: "8.8.8.8".into(),
        secondary_name: None,
        confidence,
    }
}

fn dns_config(records: Option<&[DnsRecord]>) -> DnsConfig {
    let Some(records) = records else {
        return default_dns(60.0);
    };

    let reachable: Vec<&DnsRecord> = records.iter().filter(|r| r.reachable).collect();
    match reachable.as_slice() {
        [first, second, ..] => DnsConfig {
            primary: first.ip.clone(),
            primary_name: Some(first.name.clone()),
            secondary: second.ip.clone(),
            secondary_name: Some(second.name.clone()),
            confidence: first.reliability_pct,
        },
        [only] => DnsConfig {
            primary: only.ip.clone(),
            primary_name: Some(only.name.clone()),
            secondary: "1.1.1.1".into(),
            secondary_name: None,
            confidence: only.reliability_pct,
        },
        [] => default_dns(50.0),
    }
}

fn cdn_strategy(records: Option<&[CdnRecord]>) -> CdnStrategy {
    let Some(records) = records else {
        return CdnStrategy {
            strategy: "Use Cloudflare CDN (default)".into(),
            latency_ms: None,
            stability: None,
            confidence: 60.0,
        };
    };

    match records.iter().find(|r| r.reachable) {
        Some(best) => CdnStrategy {
            strategy: format!("Use {} as primary CDN", best.name),
            latency_ms: Some(best.total_ms),
            stability: Some(best.stability_score),
            confidence: best.stability_score,
        },
        None => CdnStrategy {
            strategy: "No CDN reachable".into(),
            latency_ms: None,
            stability: None,
            confidence: 30.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netscope_common::NetworkInfo;

    fn port(port: u16, service: &str, reachable: bool, avg_ms: f64, stability: f64) -> PortRecord {
        PortRecord {
            port,
            service: service.into(),
            reachable,
            avg_ms,
            stability_score: stability,
            ..Default::default()
        }
    }

    fn protocol(name: &str, avg_ms: f64, success_rate: f64) -> ProtocolRecord {
        ProtocolRecord {
            protocol: name.into(),
            avg_ms,
            success_rate,
            ..Default::default()
        }
    }

    fn build(input: DecisionInput) -> ArchitecturePlan {
        ArchitectureBuilder::new().build(&input)
    }

    #[test]
    fn test_empty_input_defaults() {
        let plan = build(DecisionInput::empty());
        assert_eq!(plan.connection_type.kind, "Direct Encrypted Tunnel");
        assert_eq!(plan.transport.kind, "TCP/TLS");
        assert_eq!(plan.transport.confidence, 60.0);
        assert_eq!(plan.encryption.category, "TLS 1.3");
        assert_eq!(plan.tunnel_category.category, "HTTPS-based Tunnel");
        assert_eq!(plan.port_protocol_combo.len(), 1);
        assert_eq!(plan.port_protocol_combo[0].port, 443);
        assert_eq!(plan.fallback_plan.len(), 4);
        assert_eq!(plan.server_location.location, "Europe (default)");
        assert_eq!(plan.dns_config.primary, "1.1.1.1");
        assert_eq!(plan.dns_config.confidence, 60.0);
        assert_eq!(plan.cdn_strategy.strategy, "Use Cloudflare CDN (default)");
    }

    #[test]
    fn test_high_stability_direct_connection() {
        let plan = build(
            DecisionInput::empty().with_network(NetworkInfo::new(1500, 90.0, "Full Cone NAT")),
        );
        assert_eq!(plan.connection_type.kind, "Direct Single Connection");
        assert_eq!(plan.connection_type.confidence, 90.0);
    }

    #[test]
    fn test_low_stability_multiplexed() {
        let plan = build(DecisionInput::empty().with_network(NetworkInfo::with_stability(20.0)));
        assert!(plan.connection_type.kind.contains("Multiplexed"));
    }

    #[test]
    fn test_failing_https_overrides_stability() {
        let plan = build(
            DecisionInput::empty()
                .with_network(NetworkInfo::with_stability(95.0))
                .with_protocol(vec![protocol("HTTPS", 400.0, 20.0)]),
        );
        assert_eq!(plan.connection_type.kind, "Obfuscated Transport");
        assert_eq!(plan.connection_type.confidence, 80.0);
    }

    #[test]
    fn test_transport_rules() {
        let plan = build(DecisionInput::empty().with_protocol(vec![
            protocol("TCP", 30.0, 100.0),
            protocol("UDP", 20.0, 100.0),
            protocol("WebSocket (TCP)", 35.0, 90.0),
        ]));
        assert_eq!(plan.transport.kind, "WebSocket over TLS");

        let plan = build(DecisionInput::empty().with_protocol(vec![
            protocol("TCP", 30.0, 100.0),
            protocol("UDP", 20.0, 10.0),
        ]));
        assert_eq!(plan.transport.kind, "TCP/TLS");
        assert_eq!(plan.transport.confidence, 80.0);

        let plan = build(DecisionInput::empty().with_protocol(vec![protocol("UDP", 20.0, 100.0)]));
        assert_eq!(plan.transport.kind, "UDP-based (QUIC-like)");

        let plan = build(DecisionInput::empty().with_protocol(vec![protocol("HTTP", 20.0, 100.0)]));
        assert_eq!(plan.transport.kind, "TCP/TLS with CDN fronting");
    }

    #[test]
    fn test_slow_tls_uses_resumption() {
        let plan = build(
            DecisionInput::empty().with_protocol(vec![protocol("TLS Handshake", 1500.0, 100.0)]),
        );
        assert_eq!(plan.encryption.category, "TLS 1.3 with session resumption");
    }

    #[test]
    fn test_tunnel_category() {
        let plan = build(
            DecisionInput::empty().with_ports(vec![port(443, "HTTPS", true, 30.0, 90.0)]),
        );
        assert!(plan.tunnel_category.category.contains("443"));

        let plan = build(
            DecisionInput::empty().with_ports(vec![port(8080, "HTTP Alt", true, 40.0, 80.0)]),
        );
        assert!(plan.tunnel_category.category.contains("8080"));

        let plan = build(
            DecisionInput::empty().with_ports(vec![port(443, "HTTPS", false, 9999.0, 0.0)]),
        );
        assert_eq!(plan.tunnel_category.category, "CDN-fronted Tunnel");
    }

    #[test]
    fn test_port_combos_prefer_443() {
        let plan = build(DecisionInput::empty().with_ports(vec![
            port(22, "SSH", true, 5.0, 99.0),
            port(80, "HTTP", true, 25.0, 85.0),
            port(443, "HTTPS", true, 30.0, 95.0),
        ]));
        let combos = &plan.port_protocol_combo;
        let order: Vec<_> = combos.iter().map(|c| c.port).collect();
        assert_eq!(order, vec![443, 80, 22]);
        assert_eq!(combos[0].protocol, "TLS/TCP");
        assert_eq!(combos[0].confidence, 90.0);
        assert_eq!(combos[1].protocol, "TCP");
        assert_eq!(combos[1].confidence, 85.0);
    }

    #[test]
    fn test_fallback_plan_levels() {
        let plan = build(DecisionInput::empty().with_ports(vec![
            port(443, "HTTPS", true, 30.0, 95.0),
            port(8443, "HTTPS Alt", true, 35.0, 90.0),
        ]));
        let levels: Vec<_> = plan.fallback_plan.iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
        assert!(plan.fallback_plan[3].strategy.contains("8443"));

        for plan in [plan, build(DecisionInput::empty())] {
            let levels: Vec<_> = plan.fallback_plan.iter().map(|l| l.level).collect();
            assert!(levels.len() >= 3);
            assert!(levels.windows(2).all(|w| w[1] == w[0] + 1));
            assert_eq!(*levels.last().unwrap() as usize, levels.len());
        }
    }

    #[test]
    fn test_dns_config() {
        let dns = |name: &str, ip: &str, reachable: bool, reliability_pct: f64| DnsRecord {
            name: name.into(),
            ip: ip.into(),
            reachable,
            reliability_pct,
            avg_ms: 10.0,
            ..Default::default()
        };

        let plan = build(DecisionInput::empty().with_dns(vec![
            dns("Cloudflare", "1.1.1.1", true, 100.0),
            dns("Google", "8.8.8.8", true, 95.0),
        ]));
        assert_eq!(plan.dns_config.primary, "1.1.1.1");
        assert_eq!(plan.dns_config.secondary, "8.8.8.8");
        assert_eq!(plan.dns_config.confidence, 100.0);

        let plan = build(DecisionInput::empty().with_dns(vec![dns("Quad9", "9.9.9.9", true, 88.0)]));
        assert_eq!(plan.dns_config.primary, "9.9.9.9");
        assert_eq!(plan.dns_config.secondary, "1.1.1.1");
        assert_eq!(plan.dns_config.confidence, 88.0);

        let plan = build(DecisionInput::empty().with_dns(vec![dns("Quad9", "9.9.9.9", false, 0.0)]));
        assert_eq!(plan.dns_config.confidence, 50.0);
    }

    #[test]
    fn test_location_and_cdn() {
        let plan = build(
            DecisionInput::empty()
                .with_location(vec![LocationRecord::default()])
                .with_cdn(vec![CdnRecord::default()]),
        );
        assert_eq!(plan.server_location.location, "Unknown");
        assert_eq!(plan.server_location.confidence, 20.0);
        assert_eq!(plan.cdn_strategy.strategy, "No CDN reachable");
        assert_eq!(plan.cdn_strategy.confidence, 30.0);
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(build(DecisionInput::empty())).unwrap();
        assert_eq!(value["connection_type"]["type"], "Direct Encrypted Tunnel");
        assert!(value["port_protocol_combo"][0].get("service").is_none());
        assert!(value["dns_config"].get("primary_name").is_none());
    }
}
