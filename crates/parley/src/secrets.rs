use std::env;
use thiserror::Error;
#[cfg(test)]
use mockall::automock;
#[cfg(test)]
use mockall::predicate::*;

/// Variables consulted for an OpenAI key, in order
pub const OPENAI_KEY_VARS: &[&str] = &["OPENAI_API_KEY"];
/// Variables consulted for an Azure OpenAI key, in order
pub const AZURE_KEY_VARS: &[&str] = &["AZURE_OPENAI_API_KEY", "OPENAI_API_KEY"];

#[derive(Error, Debug, PartialEq)]
pub enum SecretError {
    #[error("No API key configured: set the provider api_key or one of {0}")]
    Missing(String),

    #[error("Failed to access environment variable {name}: {reason}")]
    EnvVarAccess { name: String, reason: String },
}

// The process environment, behind a trait so lookups can be mocked
#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> std::result::Result<String, env::VarError>;
}

pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> std::result::Result<String, env::VarError> {
        env::var(key)
    }
}

/// Resolve an API key: an explicitly configured value wins, then each variable in order.
///
/// Blank values count as missing. A variable holding invalid unicode is an error
/// rather than being skipped.
pub fn resolve_api_key(
    configured: Option<&str>,
    vars: &[&str],
    env: &impl Environment,
) -> Result<String, SecretError> {
    if let Some(key) = configured.map(str::trim).filter(|key| !key.is_empty()) {
        return Ok(key.to_string());
    }

    for name in vars {
        match env.get_var(name) {
            Ok(value) if !value.trim().is_empty() => return Ok(value.trim().to_string()),
            Ok(_) | Err(env::VarError::NotPresent) => continue,
            Err(e @ env::VarError::NotUnicode(_)) => {
                return Err(SecretError::EnvVarAccess {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    Err(SecretError::Missing(vars.join(", ")))
}
