//! Decision engine input bundle

use crate::records::{CdnRecord, DnsRecord, LocationRecord, PortRecord, ProtocolRecord};
use serde::{Deserialize, Serialize};

/// A ranked report for one test family.
pub type FamilyReport<R> = Vec<R>;

/// Network-level summary produced by the network scanner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkInfo {
    /// Detected path MTU in bytes
    pub mtu: Option<u32>,
    /// Whole-connection stability (0-100)
    pub stability_score: Option<f64>,
    /// NAT classification, e.g. `"Symmetric / Restricted NAT"`
    pub nat_type: Option<String>,
}

impl NetworkInfo {
    /// Summary with every field set
    pub fn new(mtu: u32, stability_score: f64, nat_type: impl Into<String>) -> Self {
        Self {
            mtu: Some(mtu),
            stability_score: Some(stability_score),
            nat_type: Some(nat_type.into()),
        }
    }

    /// Summary carrying only a stability score
    pub fn with_stability(stability_score: f64) -> Self {
        Self {
            stability_score: Some(stability_score),
            ..Default::default()
        }
    }

    /// No field carries a value
    pub fn is_empty(&self) -> bool {
        self.mtu.is_none() && self.stability_score.is_none() && self.nat_type.is_none()
    }
}

/// Everything the decision engine may consume. Every member is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionInput {
    /// Network summary
    pub network: Option<NetworkInfo>,
    /// Global latency report
    pub location: Option<FamilyReport<LocationRecord>>,
    /// DNS resolver report
    pub dns: Option<FamilyReport<DnsRecord>>,
    /// CDN edge report
    pub cdn: Option<FamilyReport<CdnRecord>>,
    /// Protocol summary report
    pub protocol: Option<FamilyReport<ProtocolRecord>>,
    /// Port reachability report
    pub ports: Option<FamilyReport<PortRecord>>,
}

/// Present and non-empty, or nothing.
#[inline]
fn present<R>(report: &Option<FamilyReport<R>>) -> Option<&[R]> {
    report.as_deref().filter(|records| !records.is_empty())
}

impl DecisionInput {
    /// Input with no data at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Network summary; a summary with no fields counts as absent
    pub fn network(&self) -> Option<&NetworkInfo> {
        self.network.as_ref().filter(|network| !network.is_empty())
    }

    /// Location records; an empty report counts as absent
    pub fn location(&self) -> Option<&[LocationRecord]> {
        present(&self.location)
    }

    /// DNS records; an empty report counts as absent
    pub fn dns(&self) -> Option<&[DnsRecord]> {
        present(&self.dns)
    }

    /// CDN records; an empty report counts as absent
    pub fn cdn(&self) -> Option<&[CdnRecord]> {
        present(&self.cdn)
    }

    /// Protocol records; an empty report counts as absent
    pub fn protocol(&self) -> Option<&[ProtocolRecord]> {
        present(&self.protocol)
    }

    /// Port records; an empty report counts as absent
    pub fn ports(&self) -> Option<&[PortRecord]> {
        present(&self.ports)
    }

    /// Attach a network summary
    pub fn with_network(mut self, network: NetworkInfo) -> Self {
        self.network = Some(network);
        self
    }

    /// Attach a location report
    pub fn with_location(mut self, records: Vec<LocationRecord>) -> Self {
        self.location = Some(records);
        self
    }

    /// Attach a DNS report
    pub fn with_dns(mut self, records: Vec<DnsRecord>) -> Self {
        self.dns = Some(records);
        self
    }

    /// Attach a CDN report
    pub fn with_cdn(mut self, records: Vec<CdnRecord>) -> Self {
        self.cdn = Some(records);
        self
    }

    /// Attach a protocol report
    pub fn with_protocol(mut self, records: Vec<ProtocolRecord>) -> Self {
        self.protocol = Some(records);
        self
    }

    /// Attach a port report
    pub fn with_ports(mut self, records: Vec<PortRecord>) -> Self {
        self.ports = Some(records);
        self
    }
}
