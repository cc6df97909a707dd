//! Connection parameter templates
//!
//! Software-independent tuning values derived from the network summary,
//! the port report and, when available, an [`ArchitecturePlan`].

use crate::architecture::ArchitecturePlan;
use netscope_common::{DecisionInput, NetscopeResult, NetworkInfo};
use serde::{Deserialize, Serialize};

const DEFAULT_MTU: u32 = 1400;
const DEFAULT_STABILITY: f64 = 80.0;
const DEFAULT_TRANSPORT: &str = "TCP/TLS";
const DEFAULT_LISTEN_PORT: u16 = 443;

/// IP + TCP header overhead removed from the detected path MTU
const MTU_OVERHEAD: u32 = 28;
const MSS_OVERHEAD: u32 = 40;

const TEMPLATE_NOTE: &str =
    "This is a generic connection template. Adapt for your specific software.";

/// Stability bands shared by the connection and reliability groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    High,
    Medium,
    Low,
}

impl Band {
    fn of(stability: f64) -> Self {
        if stability > 70.0 {
            Band::High
        } else if stability > 40.0 {
            Band::Medium
        } else {
            Band::Low
        }
    }
}

/// MTU and segment sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParameters {
    /// MTU in bytes
    pub mtu: u32,
    /// Maximum segment size
    pub mss: u32,
    /// `"auto"` or `"pre-fragment"`
    pub fragment_strategy: String,
    /// Explanation
    pub detail: String,
}

/// Timeouts and keepalive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    /// Connect timeout, seconds
    pub connect_timeout_s: u32,
    /// Read timeout, seconds
    pub read_timeout_s: u32,
    /// Keepalive interval, seconds
    pub keepalive_interval_s: u32,
    /// Unanswered keepalives before the connection is dropped
    pub keepalive_probes: u32,
    /// Idle timeout, seconds
    pub idle_timeout_s: u32,
    /// Explanation
    pub detail: String,
}

/// Transport selection and socket flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportParameters {
    /// Transport from the architecture plan
    pub transport_type: String,
    /// `"enabled"` or `"recommended"`
    pub multiplexing: String,
    /// Streams per multiplexed connection
    pub max_concurrent_streams: u32,
    /// Socket buffer, KB
    pub buffer_size_kb: u32,
    /// Enable TCP Fast Open
    pub tcp_fast_open: bool,
    /// Disable Nagle
    pub tcp_nodelay: bool,
    /// Explanation
    pub detail: String,
}

/// Retry and failover policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityParameters {
    /// Reconnect attempts
    pub retry_max: u32,
    /// First retry delay, seconds
    pub retry_initial_delay_s: u32,
    /// `"linear"`, `"exponential"` or `"exponential_with_jitter"`
    pub retry_strategy: String,
    /// Health check interval, seconds
    pub health_check_interval_s: u32,
    /// Failed checks before failover
    pub failover_threshold: u32,
    /// Explanation
    pub detail: String,
}

/// Every group flattened into one key/value block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Usage note
    #[serde(rename = "# NOTE")]
    pub note: String,
    /// First reachable port, or 443
    pub listen_port: u16,
    /// MTU in bytes
    pub mtu: u32,
    /// Transport type
    pub transport: String,
    /// Multiplexing mode
    pub multiplexing: String,
    /// Streams per multiplexed connection
    pub max_streams: u32,
    /// Socket buffer, KB
    pub buffer_size_kb: u32,
    /// Enable TCP Fast Open
    pub tcp_fast_open: bool,
    /// Disable Nagle
    pub tcp_nodelay: bool,
    /// Connect timeout, seconds
    pub connect_timeout: u32,
    /// Read timeout, seconds
    pub read_timeout: u32,
    /// Keepalive interval, seconds
    pub keepalive_interval: u32,
    /// Unanswered keepalives before the connection is dropped
    pub keepalive_probes: u32,
    /// Idle timeout, seconds
    pub idle_timeout: u32,
    /// Reconnect attempts
    pub retry_max: u32,
    /// First retry delay, seconds
    pub retry_delay: u32,
    /// Backoff strategy
    pub retry_strategy: String,
    /// Health check interval, seconds
    pub health_check_interval: u32,
    /// Failed checks before failover
    pub failover_threshold: u32,
    /// Primary resolver from the architecture plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_primary: Option<String>,
    /// Secondary resolver from the architecture plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_secondary: Option<String>,
    /// Server location from the architecture plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_server_location: Option<String>,
}

/// Complete configuration template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigTemplate {
    /// MTU and segment sizing
    pub network_parameters: NetworkParameters,
    /// Timeouts and keepalive
    pub connection_parameters: ConnectionParameters,
    /// Transport and socket flags
    pub transport_parameters: TransportParameters,
    /// Retry and failover
    pub reliability_parameters: ReliabilityParameters,
    /// Flattened template
    pub template_config: TemplateConfig,
}

impl ConfigTemplate {
    /// Pretty-printed JSON export
    pub fn to_json_pretty(&self) -> NetscopeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds a [`ConfigTemplate`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    /// Create a generator
    pub fn new() -> Self {
        Self
    }

    /// Generate a template; plan-derived values fall back to defaults when
    /// no plan is supplied
    pub fn generate(
        &self,
        input: &DecisionInput,
        architecture: Option<&ArchitecturePlan>,
    ) -> ConfigTemplate {
        let network = input.network();
        let stability = network
            .and_then(|n| n.stability_score)
            .unwrap_or(DEFAULT_STABILITY);

        let net = network_parameters(network);
        let conn = connection_parameters(stability);
        let trans = transport_parameters(architecture);
        let rel = reliability_parameters(stability);

        let listen_port = input
            .ports()
            .and_then(|ports| ports.iter().find(|p| p.reachable))
            .map_or(DEFAULT_LISTEN_PORT, |p| p.port);

        let template_config = TemplateConfig {
            note: TEMPLATE_NOTE.into(),
            listen_port,
            mtu: net.mtu,
            transport: trans.transport_type.clone(),
            multiplexing: trans.multiplexing.clone(),
            max_streams: trans.max_concurrent_streams,
            buffer_size_kb: trans.buffer_size_kb,
            tcp_fast_open: trans.tcp_fast_open,
            tcp_nodelay: trans.tcp_nodelay,
            connect_timeout: conn.connect_timeout_s,
            read_timeout: conn.read_timeout_s,
            keepalive_interval: conn.keepalive_interval_s,
            keepalive_probes: conn.keepalive_probes,
            idle_timeout: conn.idle_timeout_s,
            retry_max: rel.retry_max,
            retry_delay: rel.retry_initial_delay_s,
            retry_strategy: rel.retry_strategy.clone(),
            health_check_interval: rel.health_check_interval_s,
            failover_threshold: rel.failover_threshold,
            dns_primary: architecture.map(|a| a.dns_config.primary.clone()),
            dns_secondary: architecture.map(|a| a.dns_config.secondary.clone()),
            preferred_server_location: architecture.map(|a| a.server_location.location.clone()),
        };

        ConfigTemplate {
            network_parameters: net,
            connection_parameters: conn,
            transport_parameters: trans,
            reliability_parameters: rel,
            template_config,
        }
    }
}

fn network_parameters(network: Option<&NetworkInfo>) -> NetworkParameters {
    let mtu = match network.and_then(|n| n.mtu) {
        Some(detected) if detected > 0 => detected.saturating_sub(MTU_OVERHEAD),
        _ => DEFAULT_MTU,
    };
    let mss = mtu.saturating_sub(MSS_OVERHEAD);

    NetworkParameters {
        mtu,
        mss,
        fragment_strategy: if mtu >= DEFAULT_MTU { "auto" } else { "pre-fragment" }.into(),
        detail: format!(
            "MTU set to {mtu} based on detection. MSS = {mss} to avoid IP fragmentation."
        ),
    }
}

fn connection_parameters(stability: f64) -> ConnectionParameters {
    let (timeout, keepalive, probes) = match Band::of(stability) {
        Band::High => (30, 60, 3),
        Band::Medium => (15, 30, 5),
        Band::Low => (10, 15, 5),
    };

    ConnectionParameters {
        connect_timeout_s: timeout,
        read_timeout_s: timeout * 2,
        keepalive_interval_s: keepalive,
        keepalive_probes: probes,
        idle_timeout_s: keepalive * 3,
        detail: format!(
            "Timeouts tuned for {stability}% stability. Lower stability means more aggressive keepalive."
        ),
    }
}

fn transport_parameters(architecture: Option<&ArchitecturePlan>) -> TransportParameters {
    let transport = architecture
        .map(|a| a.transport.kind.clone())
        .unwrap_or_else(|| DEFAULT_TRANSPORT.to_string());
    let multiplexing = if transport.contains("WebSocket") || transport.contains("Mux") {
        "enabled"
    } else {
        "recommended"
    };

    TransportParameters {
        detail: format!("Transport: {transport}. Multiplexing: {multiplexing}."),
        transport_type: transport,
        multiplexing: multiplexing.into(),
        max_concurrent_streams: 8,
        buffer_size_kb: 64,
        tcp_fast_open: true,
        tcp_nodelay: true,
    }
}

fn reliability_parameters(stability: f64) -> ReliabilityParameters {
    let (retry_max, retry_delay, strategy) = match Band::of(stability) {
        Band::High => (3, 5, "linear"),
        Band::Medium => (5, 3, "exponential"),
        Band::Low => (10, 1, "exponential_with_jitter"),
    };

    ReliabilityParameters {
        retry_max,
        retry_initial_delay_s: retry_delay,
        retry_strategy: strategy.into(),
        health_check_interval_s: if stability > 50.0 { 30 } else { 15 },
        failover_threshold: 3,
        detail: format!(
            "Retry strategy: {strategy} with max {retry_max} attempts. Adjusted for {stability}% stability."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::ArchitectureBuilder;
    use netscope_common::{PortRecord, ProtocolRecord};

    fn generate(input: &DecisionInput) -> ConfigTemplate {
        TemplateGenerator::new().generate(input, None)
    }

    #[test]
    fn test_mtu_from_detection() {
        let input = DecisionInput::empty().with_network(NetworkInfo::new(1500, 90.0, "Unknown"));
        let template = generate(&input);
        assert_eq!(template.network_parameters.mtu, 1472);
        assert_eq!(template.network_parameters.mss, 1432);
        assert_eq!(template.network_parameters.fragment_strategy, "auto");
        assert_eq!(template.template_config.mtu, 1472);
    }

    #[test]
    fn test_small_mtu_pre_fragments() {
        let input = DecisionInput::empty().with_network(NetworkInfo {
            mtu: Some(1200),
            ..Default::default()
        });
        let template = generate(&input);
        assert_eq!(template.network_parameters.mtu, 1172);
        assert_eq!(template.network_parameters.fragment_strategy, "pre-fragment");
    }

    #[test]
    fn test_low_stability_uses_jitter() {
        let input = DecisionInput::empty().with_network(NetworkInfo::with_stability(20.0));
        let template = generate(&input);
        let rel = &template.reliability_parameters;
        assert_eq!(rel.retry_strategy, "exponential_with_jitter");
        assert!(rel.retry_max > 5);
        assert_eq!(rel.health_check_interval_s, 15);

        let conn = &template.connection_parameters;
        assert_eq!(conn.connect_timeout_s, 10);
        assert_eq!(conn.read_timeout_s, 20);
        assert_eq!(conn.idle_timeout_s, 45);
    }

    #[test]
    fn test_high_stability_uses_linear() {
        let input = DecisionInput::empty().with_network(NetworkInfo::with_stability(90.0));
        let template = generate(&input);
        assert_eq!(template.reliability_parameters.retry_strategy, "linear");
        assert_eq!(template.connection_parameters.keepalive_probes, 3);
    }

    #[test]
    fn test_medium_stability_band() {
        let input = DecisionInput::empty().with_network(NetworkInfo::with_stability(60.0));
        let template = generate(&input);
        assert_eq!(template.connection_parameters.connect_timeout_s, 15);
        assert_eq!(template.connection_parameters.keepalive_probes, 5);
        assert_eq!(template.reliability_parameters.retry_strategy, "exponential");
        assert_eq!(template.reliability_parameters.health_check_interval_s, 30);
    }

    #[test]
    fn test_empty_input_defaults() {
        let template = generate(&DecisionInput::empty());
        assert_eq!(template.network_parameters.mtu, 1400);
        assert_eq!(template.network_parameters.mss, 1360);
        assert_eq!(template.transport_parameters.transport_type, "TCP/TLS");
        assert_eq!(template.transport_parameters.multiplexing, "recommended");
        assert_eq!(template.reliability_parameters.retry_strategy, "linear");
        assert_eq!(template.template_config.listen_port, 443);
        assert!(template.template_config.dns_primary.is_none());
    }

    #[test]
    fn test_listen_port_from_first_reachable() {
        let input = DecisionInput::empty().with_ports(vec![
            PortRecord { port: 22, reachable: false, ..Default::default() },
            PortRecord { port: 8443, reachable: true, ..Default::default() },
        ]);
        assert_eq!(generate(&input).template_config.listen_port, 8443);
    }

    #[test]
    fn test_plan_values_copied() {
        let input = DecisionInput::empty().with_protocol(vec![
            ProtocolRecord { protocol: "TCP".into(), avg_ms: 30.0, success_rate: 100.0, ..Default::default() },
            ProtocolRecord { protocol: "WebSocket (TCP)".into(), avg_ms: 40.0, success_rate: 100.0, ..Default::default() },
        ]);
        let plan = ArchitectureBuilder::new().build(&input);
        let template = TemplateGenerator::new().generate(&input, Some(&plan));

        assert_eq!(template.transport_parameters.transport_type, "WebSocket over TLS");
        assert_eq!(template.transport_parameters.multiplexing, "enabled");
        assert_eq!(template.template_config.dns_primary.as_deref(), Some("1.1.1.1"));
        assert_eq!(template.template_config.dns_secondary.as_deref(), Some("8.8.8.8"));
        assert_eq!(
            template.template_config.preferred_server_location.as_deref(),
            Some("Europe (default)")
        );
    }

    #[test]
    fn test_json_export() {
        let json = generate(&DecisionInput::empty()).to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["template_config"]["listen_port"], 443);
        assert!(value["template_config"].get("# NOTE").is_some());
        assert!(value["template_config"].get("dns_primary").is_none());
        assert!(json.contains('\n'));
    }
}
