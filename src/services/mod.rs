pub mod agent;
pub mod orchestrator;

pub use agent::{AgentClient, HttpAgentClient};
pub use orchestrator::{OrchestratorConfig, OrchestratorConfigPatch, RecommendationOrchestrator};
