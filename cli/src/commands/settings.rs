//! Agent settings commands

use super::AgentClient;
use crate::output::{FieldRow, OutputFormat};
use crate::SettingsCommands;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct AgentSettings {
    restricted_mode: bool,
}

pub async fn handle(action: SettingsCommands, client: &AgentClient, format: OutputFormat) -> Result<()> {
    let settings: AgentSettings = match action {
        SettingsCommands::Get => client.get("/api/settings").await?,
        SettingsCommands::Set { restricted } => {
            client
                .post("/api/settings", &AgentSettings { restricted_mode: restricted })
                .await?
        }
    };
    let rows = vec![FieldRow::new("restricted_mode", settings.restricted_mode)];
    format.print_rows(&settings, rows);
    Ok(())
}
