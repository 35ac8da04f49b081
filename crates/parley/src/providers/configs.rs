use std::time::Duration;

/// Upper bound on a whole completion, stream included
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_AZURE_API_VERSION: &str = "2025-04-01-preview";

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Azure(AzureProviderConfig),
}

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<i32>,
    pub timeout: Duration,
}

/// An Azure OpenAI deployment; the model is implied by the deployment
#[derive(Debug, Clone)]
pub struct AzureProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub max_tokens: Option<i32>,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        match self {
            ProviderConfig::OpenAi(config) => config.timeout,
            ProviderConfig::Azure(config) => config.timeout,
        }
    }
}
