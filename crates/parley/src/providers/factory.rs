use std::sync::Arc;

use super::{base::Provider, configs::ProviderConfig, openai::OpenAiProvider};
use crate::errors::ProviderResult;
use strum_macros::{Display, EnumIter};

#[derive(EnumIter, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Azure,
}

/// Construct the provider for `config`.
///
/// Both flavors share the openai client; they differ only in URL and auth header.
pub fn get_provider(config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
    Ok(Arc::new(OpenAiProvider::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::configs::{AzureProviderConfig, DEFAULT_TIMEOUT};

    #[test]
    fn test_provider_type() {
        let config = ProviderConfig::Azure(AzureProviderConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "key".to_string(),
            deployment: "gpt-4o".to_string(),
            api_version: "2025-04-01-preview".to_string(),
            max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
        });
        assert_eq!(ProviderType::Azure.to_string(), "azure");
        assert!(get_provider(config).is_ok());
    }
}
