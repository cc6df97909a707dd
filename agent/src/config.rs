//! Agent Configuration

use netscope_probe::catalog::DEFAULT_PORT_TARGET;
use netscope_probe::{ProbeOverrides, ProbeSettings};
use serde::{Deserialize, Serialize};

/// Default config path, overridden by `NETSCOPE_CONFIG`
pub const DEFAULT_CONFIG_PATH: &str = "/etc/netscope/agent.json";

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// API listen address
    pub listen_addr: String,
    /// Restricted mode at startup
    pub restricted_mode: bool,
    /// Destination for the port scan
    pub port_target: String,
    /// Per-family probe overrides
    pub overrides: FamilyOverrides,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".into(),
            restricted_mode: false,
            port_target: DEFAULT_PORT_TARGET.into(),
            overrides: FamilyOverrides::default(),
        }
    }
}

/// Overrides keyed by test family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyOverrides {
    pub network: ProbeOverrides,
    pub location: ProbeOverrides,
    pub dns: ProbeOverrides,
    pub cdn: ProbeOverrides,
    pub protocol: ProbeOverrides,
    pub ports: ProbeOverrides,
}

/// Test family selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Network,
    Location,
    Dns,
    Cdn,
    Protocol,
    Ports,
}

impl AgentConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save to file
    pub fn save(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Family defaults with configured overrides and the current mode applied
    pub fn settings(&self, family: Family, restricted: bool) -> ProbeSettings {
        let (base, overrides) = match family {
            Family::Network => (ProbeSettings::network(), &self.overrides.network),
            Family::Location => (ProbeSettings::location(), &self.overrides.location),
            // the analyzer fixes its own sample count
            Family::Dns => (ProbeSettings::dns(1, 1), &self.overrides.dns),
            Family::Cdn => (ProbeSettings::cdn(), &self.overrides.cdn),
            Family::Protocol => (ProbeSettings::protocol(), &self.overrides.protocol),
            Family::Ports => (ProbeSettings::ports(), &self.overrides.ports),
        };
        base.with_overrides(overrides).restricted(restricted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_partial_config() {
        let config: AgentConfig = serde_json::from_str(
            r#"{"restricted_mode": true, "overrides": {"ports": {"samples": 1, "timeout_ms": 250}}}"#,
        )
        .unwrap();
        assert!(config.restricted_mode);
        assert_eq!(config.listen_addr, "127.0.0.1:5000");
        assert_eq!(config.port_target, "8.8.8.8");

        let ports = config.settings(Family::Ports, false);
        assert_eq!(ports.samples, 1);
        assert_eq!(ports.timeout, Duration::from_millis(250));
        assert_eq!(ports.max_workers, 8);
    }

    #[test]
    fn test_settings_follow_mode() {
        let config = AgentConfig::default();
        assert!(config.settings(Family::Cdn, true).restricted);
        assert!(!config.settings(Family::Location, false).restricted);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("netscope-agent-{}.json", std::process::id()));
        let path = path.to_str().unwrap().to_string();

        let mut config = AgentConfig::default();
        config.listen_addr = "0.0.0.0:8080".into();
        config.save(&path).unwrap();

        let loaded = AgentConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        assert!(AgentConfig::load("/nonexistent/netscope/agent.json").is_err());
    }
}
