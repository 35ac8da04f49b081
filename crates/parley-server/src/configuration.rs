use crate::error::{missing_field_path, to_env_var, ConfigError, ENV_PREFIX};
use config::{Config, Environment};
use parley::providers::configs::{
    AzureProviderConfig, OpenAiProviderConfig, ProviderConfig, DEFAULT_AZURE_API_VERSION,
    DEFAULT_TIMEOUT,
};
use parley::providers::factory::ProviderType;
use parley::secrets::{self, AZURE_KEY_VARS, OPENAI_KEY_VARS};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        max_tokens: Option<i32>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Azure {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
        deployment: String,
        #[serde(default = "default_api_version")]
        api_version: String,
        #[serde(default)]
        max_tokens: Option<i32>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Azure { .. } => ProviderType::Azure,
        }
    }

    // Convert to the parley ProviderConfig, resolving the API key against the environment
    pub fn into_config(
        self,
        env: &impl secrets::Environment,
    ) -> Result<ProviderConfig, ConfigError> {
        let config = match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                max_tokens,
                timeout_secs,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host: host.trim_end_matches('/').to_string(),
                api_key: secrets::resolve_api_key(api_key.as_deref(), OPENAI_KEY_VARS, env)?,
                model,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            }),
            ProviderSettings::Azure {
                endpoint,
                api_key,
                deployment,
                api_version,
                max_tokens,
                timeout_secs,
            } => ProviderConfig::Azure(AzureProviderConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key: secrets::resolve_api_key(api_key.as_deref(), AZURE_KEY_VARS, env)?,
                deployment,
                api_version,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            }),
        };
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Provider defaults
            .set_default("provider.type", "openai")?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(path) = missing_field_path(&err.to_string()) {
                    // Only provider settings have required fields
                    let path = if path.contains('.') {
                        path
                    } else {
                        format!("provider.{}", path)
                    };
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&path),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_api_version() -> String {
    DEFAULT_AZURE_API_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley::secrets::SecretError;
    use serial_test::serial;
    use std::env;

    struct FixedEnvironment(Vec<(&'static str, &'static str)>);

    impl secrets::Environment for FixedEnvironment {
        fn get_var(&self, key: &str) -> Result<String, env::VarError> {
            self.0
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
                .ok_or(env::VarError::NotPresent)
        }
    }

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("PARLEY_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("PARLEY_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.provider.provider_type(), ProviderType::OpenAi);

        if let ProviderSettings::OpenAi {
            host,
            api_key,
            model,
            max_tokens,
            timeout_secs,
        } = settings.provider
        {
            assert_eq!(host, "https://api.openai.com");
            assert_eq!(api_key.as_deref(), Some("test-key"));
            assert_eq!(model, "gpt-4o");
            assert_eq!(max_tokens, None);
            assert_eq!(timeout_secs, 600);
        } else {
            panic!("Expected OpenAI provider");
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_azure_settings() {
        clean_env();
        env::set_var("PARLEY_PROVIDER__TYPE", "azure");
        env::set_var("PARLEY_PROVIDER__ENDPOINT", "https://contoso.openai.azure.com/");
        env::set_var("PARLEY_PROVIDER__DEPLOYMENT", "gpt-4o-mini");
        env::set_var("PARLEY_PROVIDER__MAX_TOKENS", "2000");
        env::set_var("PARLEY_PROVIDER__TIMEOUT_SECS", "30");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.provider.provider_type(), ProviderType::Azure);

        let env = FixedEnvironment(vec![("AZURE_OPENAI_API_KEY", "azure-key")]);
        match settings.provider.into_config(&env).unwrap() {
            ProviderConfig::Azure(config) => {
                assert_eq!(config.endpoint, "https://contoso.openai.azure.com");
                assert_eq!(config.deployment, "gpt-4o-mini");
                assert_eq!(config.api_key, "azure-key");
                assert_eq!(config.api_version, DEFAULT_AZURE_API_VERSION);
                assert_eq!(config.max_tokens, Some(2000));
                assert_eq!(config.timeout, Duration::from_secs(30));
            }
            other => panic!("Expected Azure config, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("PARLEY_SERVER__PORT", "8080");
        env::set_var("PARLEY_PROVIDER__TYPE", "openai");
        env::set_var("PARLEY_PROVIDER__HOST", "https://custom.openai.com");
        env::set_var("PARLEY_PROVIDER__MODEL", "gpt-4.1");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);

        let env = FixedEnvironment(vec![("OPENAI_API_KEY", "env-key")]);
        match settings.provider.into_config(&env).unwrap() {
            ProviderConfig::OpenAi(config) => {
                assert_eq!(config.host, "https://custom.openai.com");
                assert_eq!(config.model, "gpt-4.1");
                assert_eq!(config.api_key, "env-key");
            }
            other => panic!("Expected OpenAI config, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_azure_endpoint_names_env_var() {
        clean_env();
        env::set_var("PARLEY_PROVIDER__TYPE", "azure");
        env::set_var("PARLEY_PROVIDER__DEPLOYMENT", "gpt-4o-mini");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "PARLEY_PROVIDER__ENDPOINT")
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let settings = ProviderSettings::OpenAi {
            host: default_openai_host(),
            api_key: None,
            model: default_model(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        };

        let err = settings.into_config(&FixedEnvironment(vec![])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Secret(SecretError::Missing(vars)) if vars == "OPENAI_API_KEY"
        ));
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");

        let bad = ServerSettings {
            host: "not a host".to_string(),
            port: 3000,
        };
        assert!(matches!(
            bad.socket_addr(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
