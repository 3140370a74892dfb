use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Recommendation agent API key
    pub agent_api_key: String,

    /// Recommendation agent base URL
    #[serde(default = "default_agent_api_url")]
    pub agent_api_url: String,

    /// Identifier of the agent provider/model to request
    #[serde(default = "default_agent_provider")]
    pub agent_provider: String,

    /// Per-attempt timeout for agent calls, in milliseconds
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,

    /// Maximum number of retries after the initial agent attempt
    #[serde(default = "default_agent_max_retries")]
    pub agent_max_retries: u32,

    /// Base delay for exponential retry backoff, in milliseconds
    #[serde(default = "default_agent_retry_delay_ms")]
    pub agent_retry_delay_ms: u64,

    /// Maximum requests allowed per client within one rate-limit window
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    /// Rate-limit window duration, in milliseconds
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_agent_api_url() -> String {
    "https://api.cinematch.dev/agent".to_string()
}

fn default_agent_provider() -> String {
    "cinematch-v1".to_string()
}

fn default_agent_timeout_ms() -> u64 {
    30_000
}

fn default_agent_max_retries() -> u32 {
    3
}

fn default_agent_retry_delay_ms() -> u64 {
    1_000
}

fn default_rate_limit_max_requests() -> u32 {
    10
}

fn default_rate_limit_window_ms() -> u64 {
    60_000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
