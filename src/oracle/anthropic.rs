//! Messages-API client for the inference service

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::oracle::{OracleClient, OracleError};

const API_VERSION: &str = "2023-06-01";

/// Oracle connection settings
#[derive(Debug, Clone)]
pub struct OracleSettings {
    /// Messages endpoint
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

pub struct AnthropicClient {
    settings: OracleSettings,
    client: Client,
}

impl AnthropicClient {
    pub fn new(settings: OracleSettings) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| OracleError::Communication(e.to_string()))?;

        Ok(Self { settings, client })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl OracleClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        info!(model = %self.settings.model, prompt_len = prompt.len(), "calling oracle");

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.settings.model,
                "max_tokens": self.settings.max_tokens,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| OracleError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OracleError::Communication(format!("status {}: {}", status, body)));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))?;
        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(OracleError::Decode("empty completion".to_string()));
        }
        Ok(text)
    }
}
