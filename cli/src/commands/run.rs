//! Test family commands

use super::AgentClient;
use crate::output::{
    field_rows, CdnRow, DnsRow, FieldRow, LocationRow, OutputFormat, PortRow, ProtocolRow,
};
use crate::TestFamily;
use anyhow::Result;
use colored::*;
use netscope_common::{CdnRecord, DnsRecord, LocationRecord, PortRecord, ProtocolRecord};
use serde::{Deserialize, Serialize};

/// Family endpoints all answer with at least the ranked `results`
#[derive(Debug, Serialize, Deserialize)]
pub struct FamilyResponse<R> {
    pub results: Vec<R>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn endpoint(family: TestFamily) -> &'static str {
    match family {
        TestFamily::Network => "/api/network/scan",
        TestFamily::Ping => "/api/ping/test",
        TestFamily::Dns => "/api/dns/benchmark",
        TestFamily::Cdn => "/api/cdn/test",
        TestFamily::Protocol => "/api/protocol/benchmark",
        TestFamily::Ports => "/api/ports/scan",
    }
}

async fn run_family<R, Row>(client: &AgentClient, family: TestFamily, format: OutputFormat) -> Result<()>
where
    R: Serialize + serde::de::DeserializeOwned,
    for<'a> Row: From<&'a R> + tabled::Tabled,
{
    let response: FamilyResponse<R> = client.post(endpoint(family), &serde_json::json!({})).await?;
    let rows: Vec<Row> = response.results.iter().map(Row::from).collect();
    format.print_rows(&response, rows);
    Ok(())
}

pub async fn handle(family: TestFamily, client: &AgentClient, format: OutputFormat) -> Result<()> {
    eprintln!("{} {:?} tests, this can take a while...", "Running".cyan(), family);

    match family {
        TestFamily::Network => {
            let scan: serde_json::Value = client.post(endpoint(family), &serde_json::json!({})).await?;
            format.print_rows(&scan, field_rows(&scan));
            Ok(())
        }
        TestFamily::Ping => run_family::<LocationRecord, LocationRow>(client, family, format).await,
        TestFamily::Dns => run_family::<DnsRecord, DnsRow>(client, family, format).await,
        TestFamily::Cdn => run_family::<CdnRecord, CdnRow>(client, family, format).await,
        TestFamily::Protocol => {
            run_family::<ProtocolRecord, ProtocolRow>(client, family, format).await
        }
        TestFamily::Ports => run_family::<PortRecord, PortRow>(client, family, format).await,
    }
}

pub async fn dns_custom(name: &str, ip: &str, client: &AgentClient, format: OutputFormat) -> Result<()> {
    let record: DnsRecord = client
        .post("/api/dns/custom", &serde_json::json!({ "name": name, "ip": ip }))
        .await?;
    let rows = vec![
        FieldRow::new("Resolver", &record.name),
        FieldRow::new("IP", &record.ip),
        FieldRow::new("Avg ms", format!("{:.2}", record.avg_ms)),
        FieldRow::new("Reliability %", record.reliability_pct),
        FieldRow::new("Queries", record.total_queries),
        FieldRow::new("Errors", record.error_count),
    ];
    format.print_rows(&record, rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_response_keeps_extras() {
        let response: FamilyResponse<PortRecord> = serde_json::from_str(
            r#"{"results": [{"port": 443, "reachable": true}], "reachable": []}"#,
        )
        .unwrap();
        assert_eq!(response.results[0].port, 443);
        assert!(response.extra.contains_key("reachable"));
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(endpoint(TestFamily::Ping), "/api/ping/test");
        assert_eq!(endpoint(TestFamily::Ports), "/api/ports/scan");
    }
}
