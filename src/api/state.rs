use std::sync::Arc;

use crate::config::Config;
use crate::middleware::rate_limit::RateLimiter;
use crate::services::{AgentClient, HttpAgentClient, OrchestratorConfig, RecommendationOrchestrator};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RecommendationOrchestrator>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Builds state with the real HTTP agent client
    pub fn new(config: &Config) -> Self {
        let client = Arc::new(HttpAgentClient::new(
            config.agent_api_key.clone(),
            config.agent_api_url.clone(),
        ));
        Self::with_agent(client, config)
    }

    /// Builds state around an injected agent client (used by tests)
    pub fn with_agent(client: Arc<dyn AgentClient>, config: &Config) -> Self {
        let orchestrator = RecommendationOrchestrator::new(
            client,
            OrchestratorConfig {
                provider: config.agent_provider.clone(),
                timeout_ms: config.agent_timeout_ms,
                max_retries: config.agent_max_retries,
                base_delay_ms: config.agent_retry_delay_ms,
            },
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            limiter: Arc::new(RateLimiter::new(
                config.rate_limit_max_requests,
                config.rate_limit_window_ms,
            )),
        }
    }
}
