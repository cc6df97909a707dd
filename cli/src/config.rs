//! CLI Configuration

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub agent_url: Option<String>,
    pub default_format: Option<String>,
}

impl Config {
    pub fn load(profile: Option<&str>) -> Result<Self> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config file")
    }

    pub fn save(&self, profile: Option<&str>) -> Result<PathBuf> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Configured output format, if it names a known one
    pub fn format(&self) -> Option<OutputFormat> {
        self.default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match key {
            "agent_url" => Ok(self.agent_url.clone()),
            "default_format" => Ok(self.default_format.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "agent_url" => self.agent_url = Some(value),
            "default_format" => {
                OutputFormat::from_str(&value, true)
                    .map_err(|_| anyhow::anyhow!("Unknown format: {}", value))?;
                self.default_format = Some(value);
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    fn config_path(profile: Option<&str>) -> Result<PathBuf> {
        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".netscope").join(Self::file_name(profile)))
    }

    fn file_name(profile: Option<&str>) -> String {
        match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        }
    }
}

pub const KEYS: &[&str] = &["agent_url", "default_format"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_file_names() {
        assert_eq!(Config::file_name(None), "config.toml");
        assert_eq!(Config::file_name(Some("lab")), "config.lab.toml");
    }

    #[test]
    fn test_parse_and_format() {
        let config = Config::parse("agent_url = \"http://10.0.0.2:5000\"\ndefault_format = \"yaml\"\n").unwrap();
        assert_eq!(config.agent_url.as_deref(), Some("http://10.0.0.2:5000"));
        assert!(matches!(config.format(), Some(OutputFormat::Yaml)));
    }

    #[test]
    fn test_set_rejects_unknown() {
        let mut config = Config::default();
        assert!(config.set("api_key", "x".into()).is_err());
        assert!(config.set("default_format", "xml".into()).is_err());
        config.set("default_format", "json".into()).unwrap();
        assert_eq!(config.get("default_format").unwrap().as_deref(), Some("json"));
    }
}
