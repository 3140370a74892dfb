use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tokio::time;

use crate::{
    error::{AppError, AppResult},
    models::{RecommendationRequest, RecommendationResponse},
    services::agent::AgentClient,
};

/// Runtime-mutable orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Identifier of the agent provider/model to request
    pub provider: String,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds
    pub base_delay_ms: u64,
}

/// Partial configuration update; present fields merge over current values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrchestratorConfigPatch {
    pub provider: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

impl OrchestratorConfig {
    fn apply(&mut self, patch: OrchestratorConfigPatch) {
        if let Some(provider) = patch.provider {
            self.provider = provider;
        }
        if let Some(timeout_ms) = patch.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(max_retries) = patch.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(base_delay_ms) = patch.base_delay_ms {
            self.base_delay_ms = base_delay_ms;
        }
    }
}

/// Wraps the external agent call with validation, a per-attempt timeout,
/// and bounded exponential-backoff retry.
///
/// Only failures classified retryable (network/timeout) are re-attempted;
/// validation failures short-circuit before any agent call, and other
/// failures surface on first occurrence.
pub struct RecommendationOrchestrator {
    client: Arc<dyn AgentClient>,
    config: RwLock<OrchestratorConfig>,
}

impl RecommendationOrchestrator {
    pub fn new(client: Arc<dyn AgentClient>, config: OrchestratorConfig) -> Self {
        Self {
            client,
            config: RwLock::new(config),
        }
    }

    /// Current configuration snapshot
    pub async fn config(&self) -> OrchestratorConfig {
        self.config.read().await.clone()
    }

    /// Merges a partial update over the current configuration
    pub async fn update_config(&self, patch: OrchestratorConfigPatch) -> OrchestratorConfig {
        let mut config = self.config.write().await;
        config.apply(patch);
        tracing::info!(
            provider = %config.provider,
            timeout_ms = config.timeout_ms,
            max_retries = config.max_retries,
            base_delay_ms = config.base_delay_ms,
            "Orchestrator configuration updated"
        );
        config.clone()
    }

    /// Submits a recommendation request, retrying transient failures
    pub async fn submit(
        &self,
        request: RecommendationRequest,
    ) -> AppResult<RecommendationResponse> {
        // Sender is held but never signalled, so cancellation cannot fire
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.submit_with_cancel(request, cancel_rx).await
    }

    /// Like [`submit`](Self::submit), but also races each attempt against an
    /// external cancellation signal.
    ///
    /// A triggered signal abandons the in-flight attempt and is classified
    /// exactly like an internal timeout (retryable). Callers wanting terminal
    /// cancellation drop the returned future instead.
    pub async fn submit_with_cancel(
        &self,
        request: RecommendationRequest,
        mut cancel: watch::Receiver<bool>,
    ) -> AppResult<RecommendationResponse> {
        request.validate()?;

        let config = self.config.read().await.clone();
        let timeout = Duration::from_millis(config.timeout_ms);
        let max_attempts = config.max_retries + 1;

        let mut attempt: u32 = 1;
        loop {
            if attempt > 1 {
                // base * 2^(n-2) before attempt n; bounded only by max_retries
                let exponent = (attempt - 2).min(63);
                let delay_ms = config.base_delay_ms.saturating_mul(1u64 << exponent);
                tracing::debug!(attempt, delay_ms, "Backing off before retry");
                time::sleep(Duration::from_millis(delay_ms)).await;
            }

            // Race the attempt against the timeout and the caller's signal.
            // The losing side is dropped, so a late completion is never
            // observed and no timer leaks.
            let outcome = tokio::select! {
                result = time::timeout(
                    timeout,
                    self.client.call_agent(&config.provider, &request),
                ) => match result {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Timeout(format!(
                        "agent call exceeded {} ms",
                        config.timeout_ms
                    ))),
                },
                _ = cancelled(&mut cancel) => {
                    Err(AppError::Timeout("request cancelled by caller".to_string()))
                }
            };

            match outcome {
                Ok(response) => {
                    tracing::info!(attempt, "Recommendation request succeeded");
                    return Ok(response);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "Retryable agent failure"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        attempt,
                        code = err.code(),
                        error = %err,
                        "Recommendation request failed"
                    );
                    return Err(err.with_attempts(attempt));
                }
            }
        }
    }
}

/// Resolves once the cancellation signal reads `true`; pends forever if the
/// sender is gone, since cancellation can no longer be requested.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
