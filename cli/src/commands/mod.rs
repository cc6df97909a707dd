//! CLI Commands

pub mod config;
pub mod decision;
pub mod report;
pub mod run;
pub mod settings;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Agent API client
pub struct AgentClient {
    pub base_url: String,
    client: reqwest::Client,
}

impl AgentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("agent unreachable at {}", self.base_url))?;
        Self::decode(resp).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("agent unreachable at {}", self.base_url))?;
        Self::decode(resp).await
    }

    /// Raw response body
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("agent unreachable at {}", self.base_url))?;
        if !resp.status().is_success() {
            bail!("agent returned {}", resp.status());
        }
        Ok(resp.text().await?)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let json: serde_json::Value = resp.json().await.context("invalid agent response")?;
        if !status.is_success() {
            bail!("{}", error_message(&json).unwrap_or_else(|| status.to_string()));
        }
        serde_json::from_value(json).context("unexpected agent response")
    }
}

fn error_message(body: &serde_json::Value) -> Option<String> {
    body.get("error")?.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_join() {
        let client = AgentClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.url("/api/report"), "http://127.0.0.1:5000/api/report");
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(&json!({"error": "IP required"})).as_deref(), Some("IP required"));
        assert!(error_message(&json!({"status": 500})).is_none());
    }
}
