//! Output formatting

use clap::ValueEnum;
use colored::*;
use netscope_common::{CdnRecord, DnsRecord, LocationRecord, PortRecord, ProtocolRecord, SENTINEL_MS};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn print<T: Serialize>(&self, data: &T) {
        match self {
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(data).unwrap_or_default());
            }
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
        }
    }

    /// Table of `rows` in table mode, `data` serialized otherwise
    pub fn print_rows<T: Serialize, R: Tabled>(&self, data: &T, rows: Vec<R>) {
        match self {
            OutputFormat::Table => println!("{}", render(rows)),
            _ => self.print(data),
        }
    }
}

pub fn render<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn ms(value: f64) -> String {
    if value >= SENTINEL_MS {
        "-".into()
    } else {
        format!("{:.1}", value)
    }
}

fn reachable(flag: bool) -> String {
    if flag {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

#[derive(Tabled)]
pub struct LocationRow {
    #[tabled(rename = "#")]
    rank: u32,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Avg ms")]
    avg: String,
    #[tabled(rename = "Jitter ms")]
    jitter: String,
    #[tabled(rename = "Loss %")]
    loss: f64,
    #[tabled(rename = "Reachable")]
    reachable: String,
}

impl From<&LocationRecord> for LocationRow {
    fn from(r: &LocationRecord) -> Self {
        Self {
            rank: r.rank,
            location: format!("{}, {}", r.city, r.country),
            region: r.region.clone(),
            avg: ms(r.avg_ms),
            jitter: format!("{:.1}", r.jitter_ms),
            loss: r.packet_loss_pct,
            reachable: reachable(r.reachable),
        }
    }
}

#[derive(Tabled)]
pub struct DnsRow {
    #[tabled(rename = "#")]
    rank: u32,
    #[tabled(rename = "Resolver")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Avg ms")]
    avg: String,
    #[tabled(rename = "Reliability %")]
    reliability: f64,
    #[tabled(rename = "Reachable")]
    reachable: String,
}

impl From<&DnsRecord> for DnsRow {
    fn from(r: &DnsRecord) -> Self {
        Self {
            rank: r.rank,
            name: r.name.clone(),
            ip: r.ip.clone(),
            avg: ms(r.avg_ms),
            reliability: r.reliability_pct,
            reachable: reachable(r.reachable),
        }
    }
}

#[derive(Tabled)]
pub struct CdnRow {
    #[tabled(rename = "#")]
    rank: u32,
    #[tabled(rename = "CDN")]
    name: String,
    #[tabled(rename = "Connect ms")]
    connect: String,
    #[tabled(rename = "Download ms")]
    download: String,
    #[tabled(rename = "Total ms")]
    total: String,
    #[tabled(rename = "Stability")]
    stability: f64,
    #[tabled(rename = "Reachable")]
    reachable: String,
}

impl From<&CdnRecord> for CdnRow {
    fn from(r: &CdnRecord) -> Self {
        Self {
            rank: r.rank,
            name: r.name.clone(),
            connect: ms(r.connect_ms),
            download: ms(r.download_ms),
            total: ms(r.total_ms),
            stability: r.stability_score,
            reachable: reachable(r.reachable),
        }
    }
}

#[derive(Tabled)]
pub struct ProtocolRow {
    #[tabled(rename = "#")]
    rank: u32,
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "Avg ms")]
    avg: String,
    #[tabled(rename = "Success %")]
    success: f64,
    #[tabled(rename = "Targets")]
    targets: u32,
}

impl From<&ProtocolRecord> for ProtocolRow {
    fn from(r: &ProtocolRecord) -> Self {
        Self {
            rank: r.rank,
            protocol: r.protocol.clone(),
            avg: ms(r.avg_ms),
            success: r.success_rate,
            targets: r.targets_tested,
        }
    }
}

#[derive(Tabled)]
pub struct PortRow {
    #[tabled(rename = "#")]
    rank: u32,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Avg ms")]
    avg: String,
    #[tabled(rename = "Stability")]
    stability: f64,
    #[tabled(rename = "Reachable")]
    reachable: String,
}

impl From<&PortRecord> for PortRow {
    fn from(r: &PortRecord) -> Self {
        Self {
            rank: r.rank,
            port: r.port,
            service: r.service.clone(),
            avg: ms(r.avg_ms),
            stability: r.stability_score,
            reachable: reachable(r.reachable),
        }
    }
}

/// Two-column row for flat objects
#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub fn new(field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

/// Rows for every scalar leaf of a JSON object, keyed by dotted path
pub fn field_rows(value: &serde_json::Value) -> Vec<FieldRow> {
    let mut rows = Vec::new();
    flatten("", value, &mut rows);
    rows
}

fn flatten(prefix: &str, value: &serde_json::Value, rows: &mut Vec<FieldRow>) {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, rows);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", prefix, i), child, rows);
            }
        }
        Value::String(s) => rows.push(FieldRow::new(prefix, s)),
        Value::Null => rows.push(FieldRow::new(prefix, "-")),
        other => rows.push(FieldRow::new(prefix, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinel_rendered_as_dash() {
        let row = PortRow::from(&PortRecord::default());
        assert_eq!(row.avg, "-");
        let row = PortRow::from(&PortRecord {
            avg_ms: 12.345,
            ..Default::default()
        });
        assert_eq!(row.avg, "12.3");
    }

    #[test]
    fn test_field_rows_flatten() {
        let rows = field_rows(&json!({
            "mtu": 1472,
            "dns": {"primary": "1.1.1.1"},
            "levels": [{"level": 1}],
            "missing": null
        }));
        let pairs: Vec<(String, String)> =
            rows.into_iter().map(|r| (r.field, r.value)).collect();
        assert!(pairs.contains(&("mtu".into(), "1472".into())));
        assert!(pairs.contains(&("dns.primary".into(), "1.1.1.1".into())));
        assert!(pairs.contains(&("levels[0].level".into(), "1".into())));
        assert!(pairs.contains(&("missing".into(), "-".into())));
    }

    #[test]
    fn test_render_has_headers() {
        let table = render(vec![FieldRow::new("mtu", 1472)]);
        assert!(table.contains("Field"));
        assert!(table.contains("1472"));
    }
}
