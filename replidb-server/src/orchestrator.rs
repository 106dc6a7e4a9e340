//! Orchestrator client - fetches cluster topology from the orchestrator API

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://orchestrator:3000/api/clusters";

/// Error bodies are cut to this many characters before being surfaced
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("orchestrator request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("orchestrator returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode orchestrator response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no clusters found")]
    NoClusters,
}

#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    client: Client,
    url: String,
}

impl OrchestratorClient {
    pub fn new(config: &OrchestratorConfig) -> Result<Self, OrchestratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// First cluster the orchestrator knows about, passed through untouched.
    pub async fn first_cluster(&self) -> Result<Map<String, Value>, OrchestratorError> {
        debug!(url = %self.url, "querying orchestrator");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::Status {
                status,
                body: truncate(body),
            });
        }

        let bytes = response.bytes().await?;
        let clusters: Vec<Map<String, Value>> = serde_json::from_slice(&bytes)?;
        clusters.into_iter().next().ok_or(OrchestratorError::NoClusters)
    }
}

fn truncate(body: String) -> String {
    if body.chars().count() > MAX_ERROR_BODY {
        let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", cut)
    } else {
        body
    }
}
