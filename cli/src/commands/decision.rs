//! Recommendation, architecture and template commands

use super::AgentClient;
use crate::output::{field_rows, OutputFormat};
use anyhow::Result;
use colored::*;
use netscope_decision::{ArchitecturePlan, ConfigTemplate, Recommendation};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Serialize, Deserialize)]
struct RecommendationsResponse {
    recommendations: Vec<Recommendation>,
}

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "P")]
    priority: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Recommendation")]
    title: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

fn priority(p: u8) -> String {
    match p {
        1 => "1".red().bold().to_string(),
        2 => "2".yellow().to_string(),
        other => other.to_string().green().to_string(),
    }
}

impl From<&Recommendation> for RecommendationRow {
    fn from(r: &Recommendation) -> Self {
        Self {
            priority: priority(r.priority),
            category: r.category.to_string(),
            title: r.title.clone(),
            value: r.value.clone(),
            confidence: format!("{:.0}%", r.confidence),
        }
    }
}

pub async fn recommendations(client: &AgentClient, format: OutputFormat) -> Result<()> {
    let response: RecommendationsResponse = client.get("/api/recommendations").await?;
    if response.recommendations.is_empty() {
        eprintln!("{}", "No results yet. Run some tests first.".yellow());
    }
    let rows: Vec<RecommendationRow> =
        response.recommendations.iter().map(RecommendationRow::from).collect();
    format.print_rows(&response, rows);
    Ok(())
}

pub async fn architecture(client: &AgentClient, format: OutputFormat) -> Result<()> {
    let plan: ArchitecturePlan = client.get("/api/architecture").await?;
    let rows = field_rows(&serde_json::to_value(&plan)?);
    format.print_rows(&plan, rows);
    Ok(())
}

pub async fn template(client: &AgentClient, format: OutputFormat) -> Result<()> {
    let template: ConfigTemplate = client.get("/api/config").await?;
    let rows = field_rows(&serde_json::to_value(&template.template_config)?);
    format.print_rows(&template, rows);
    Ok(())
}
