// Path: crates/api/src/oracle/http_adapter.rs

use super::{DecisionOracle, DecisionRequest};
use async_trait::async_trait;
use autotap_types::config::OracleConfig;
use autotap_types::error::OracleError;
use reqwest::Client;
use std::time::Duration;

/// HTTP client for the decision service. One POST per step; the reply
/// body is the directive JSON (possibly fenced), handed back verbatim.
pub struct HttpDecisionOracle {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpDecisionOracle {
    pub fn new(cfg: &OracleConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl DecisionOracle for HttpDecisionOracle {
    async fn decide(&self, request: &DecisionRequest) -> Result<String, OracleError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Decision service error {}: {}", status, body);
            return Err(OracleError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(text)
    }
}
