//! Report command

use super::AgentClient;
use crate::output::{FieldRow, OutputFormat};
use anyhow::{Context, Result};
use colored::*;

const SECTIONS: &[&str] = &[
    "network",
    "ping",
    "dns",
    "cdn",
    "protocol",
    "ports",
    "recommendations",
    "architecture",
    "config",
];

/// Which report sections carry data
fn section_rows(report: &serde_json::Value) -> Vec<FieldRow> {
    SECTIONS
        .iter()
        .map(|section| {
            let present = report.get(*section).is_some_and(|v| !v.is_null());
            FieldRow::new(*section, if present { "collected" } else { "-" })
        })
        .collect()
}

pub async fn handle(export: Option<String>, client: &AgentClient, format: OutputFormat) -> Result<()> {
    if let Some(path) = export {
        let body = client.get_text("/api/report/export").await?;
        std::fs::write(&path, body).with_context(|| format!("writing {}", path))?;
        println!("{} report to {}", "Exported".green(), path);
        return Ok(());
    }

    let report: serde_json::Value = client.get("/api/report").await?;
    format.print_rows(&report, section_rows(&report));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_rows() {
        let rows = section_rows(&json!({"network": null, "ports": {"results": []}}));
        assert_eq!(rows.len(), SECTIONS.len());
        let ports = rows.iter().find(|r| r.field == "ports").unwrap();
        assert_eq!(ports.value, "collected");
        let network = rows.iter().find(|r| r.field == "network").unwrap();
        assert_eq!(network.value, "-");
    }
}
