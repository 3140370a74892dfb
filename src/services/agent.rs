use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{RecommendationRequest, RecommendationResponse},
};

/// Boundary to the external recommendation agent.
///
/// The orchestrator only depends on this trait, so tests can substitute
/// scripted agents without any network traffic. The provider identifier is
/// passed per call because it is runtime-configurable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Performs one recommendation attempt against the agent
    async fn call_agent(
        &self,
        provider: &str,
        request: &RecommendationRequest,
    ) -> AppResult<RecommendationResponse>;
}

#[derive(Serialize)]
struct AgentPayload<'a> {
    provider: &'a str,
    #[serde(flatten)]
    request: &'a RecommendationRequest,
}

/// reqwest-backed client for the hosted recommendation agent
pub struct HttpAgentClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl HttpAgentClient {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            // No client-level timeout; the orchestrator bounds each attempt
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn call_agent(
        &self,
        provider: &str,
        request: &RecommendationRequest,
    ) -> AppResult<RecommendationResponse> {
        let url = format!("{}/recommendations", self.api_url);

        tracing::debug!(provider = %provider, "Calling recommendation agent");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&AgentPayload { provider, request })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "Agent request failed"
            );
            return Err(AppError::Agent(format!(
                "agent returned status {}: {}",
                status, body
            )));
        }

        let result: RecommendationResponse = response
            .json()
            .await
            .map_err(|e| AppError::Agent(format!("malformed agent response: {}", e)))?;

        tracing::info!(
            recommendation_count = result.recommendations.len(),
            "Agent call succeeded"
        );

        Ok(result)
    }
}
