use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;

use crate::{DecisionSource, IngestError, LoginGrant, RawDecision};

#[derive(Clone, Debug)]
pub struct HttpSourceConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Scenarios announced during the login exchange.
    pub scenarios: Vec<String>,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8080".to_string(),
            timeout_ms: 30_000,
            user_agent: concat!("banwatch/", env!("CARGO_PKG_VERSION")).to_string(),
            scenarios: vec!["ban".to_string()],
        }
    }
}

/// HTTP client for the upstream decision source.
#[derive(Clone)]
pub struct HttpDecisionSource {
    client: reqwest::Client,
    config: HttpSourceConfig,
}

impl HttpDecisionSource {
    pub fn new(config: HttpSourceConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl DecisionSource for HttpDecisionSource {
    async fn login(&self) -> Result<LoginGrant, IngestError> {
        let url = format!("{}/v1/watchers/login", self.base_url());
        let response = self
            .client
            .post(&url)
            .header(USER_AGENT, &self.config.user_agent)
            .json(&serde_json::json!({ "scenarios": self.config.scenarios }))
            .send()
            .await
            .map_err(|err| IngestError::Auth(err.to_string()))?;
        if !response.status().is_success() {
            return Err(IngestError::Auth(format!(
                "login returned status {}",
                response.status()
            )));
        }
        response
            .json::<LoginGrant>()
            .await
            .map_err(|err| IngestError::Auth(err.to_string()))
    }

    async fn poll(&self, token: &str) -> Result<Vec<RawDecision>, IngestError> {
        let url = format!(
            "{}/v1/alerts?simulated=false&has_active_decision=true&limit=10",
            self.base_url()
        );
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.config.user_agent)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| IngestError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(IngestError::Transport(format!(
                "poll returned status {}",
                response.status()
            )));
        }
        response
            .json::<Vec<RawDecision>>()
            .await
            .map_err(|err| IngestError::Malformed(err.to_string()))
    }
}
