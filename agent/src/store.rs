//! Latest result of every test family and generator

use chrono::Utc;
use netscope_common::{CdnRecord, DecisionInput, DnsRecord, LocationRecord, PortRecord, ProtocolRecord};
use netscope_decision::{ArchitecturePlan, ConfigTemplate, Recommendation};
use netscope_probe::{NetworkScan, RegionSummary};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Global latency run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingSnapshot {
    /// Ranked location records
    pub results: Vec<LocationRecord>,
    /// Per-region latency, fastest first
    pub region_summary: Vec<RegionSummary>,
    /// Top reachable locations
    pub best_locations: Vec<LocationRecord>,
}

/// DNS benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsSnapshot {
    /// Ranked resolver records
    pub results: Vec<DnsRecord>,
    /// Top reachable resolvers
    pub best_dns: Vec<DnsRecord>,
}

/// CDN run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdnSnapshot {
    /// Ranked CDN records
    pub results: Vec<CdnRecord>,
    /// Top reachable edges
    pub best_cdn: Vec<CdnRecord>,
}

/// Protocol benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSnapshot {
    /// Ranked protocol summaries
    pub results: Vec<ProtocolRecord>,
}

/// Port scan run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortsSnapshot {
    /// Ranked port records
    pub results: Vec<PortRecord>,
    /// Reachable ports only
    pub reachable: Vec<PortRecord>,
}

/// Everything the agent has produced so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshots {
    /// Latest network scan
    pub network: Option<NetworkScan>,
    /// Latest global latency run
    pub ping: Option<PingSnapshot>,
    /// Latest DNS benchmark
    pub dns: Option<DnsSnapshot>,
    /// Latest CDN run
    pub cdn: Option<CdnSnapshot>,
    /// Latest protocol benchmark
    pub protocol: Option<ProtocolSnapshot>,
    /// Latest port scan
    pub ports: Option<PortsSnapshot>,
    /// Last generated recommendations
    pub recommendations: Option<Vec<Recommendation>>,
    /// Last generated architecture
    pub architecture: Option<ArchitecturePlan>,
    /// Last generated template
    pub config: Option<ConfigTemplate>,
}

impl Snapshots {
    /// Decision input assembled from the stored family reports
    pub fn decision_input(&self) -> DecisionInput {
        DecisionInput {
            network: self.network.as_ref().map(NetworkScan::info),
            location: self.ping.as_ref().map(|s| s.results.clone()),
            dns: self.dns.as_ref().map(|s| s.results.clone()),
            cdn: self.cdn.as_ref().map(|s| s.results.clone()),
            protocol: self.protocol.as_ref().map(|s| s.results.clone()),
            ports: self.ports.as_ref().map(|s| s.results.clone()),
        }
    }
}

/// Full report with a generation time in Unix seconds
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Stored results
    #[serde(flatten)]
    pub snapshots: Snapshots,
    /// Unix seconds
    pub generated_at: f64,
}

/// Snapshot store shared by the HTTP handlers.
///
/// Probing never holds the lock; handlers write a finished report in one
/// short critical section.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: Mutex<Snapshots>,
}

impl SnapshotStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a change under the lock
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Snapshots),
    {
        let mut guard = self.inner.lock();
        f(&mut *guard);
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Snapshots {
        self.inner.lock().clone()
    }

    /// Decision input from the stored reports
    pub fn decision_input(&self) -> DecisionInput {
        self.inner.lock().decision_input()
    }

    /// Last generated architecture plan
    pub fn architecture(&self) -> Option<ArchitecturePlan> {
        self.inner.lock().architecture.clone()
    }

    /// Snapshot stamped with the current time
    pub fn report(&self) -> Report {
        Report {
            snapshots: self.snapshot(),
            generated_at: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = SnapshotStore::new();
        assert_eq!(store.decision_input(), DecisionInput::empty());
        assert!(store.architecture().is_none());

        let value = serde_json::to_value(store.report()).unwrap();
        assert!(value["network"].is_null());
        assert!(value["config"].is_null());
        assert!(value["generated_at"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_reports_feed_decision_input() {
        let store = SnapshotStore::new();
        let port = PortRecord {
            port: 443,
            reachable: true,
            avg_ms: 20.0,
            ..Default::default()
        };
        store.update(|s| {
            s.ports = Some(PortsSnapshot {
                results: vec![port.clone()],
                reachable: vec![port.clone()],
            })
        });

        let input = store.decision_input();
        assert_eq!(input.ports(), Some(&[port][..]));
        assert!(input.location().is_none());
        assert!(input.network().is_none());
    }
}
