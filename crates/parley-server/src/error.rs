use parley::secrets::SecretError;
use thiserror::Error;

/// Prefix shared by every configuration environment variable
pub const ENV_PREFIX: &str = "PARLEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: set {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("Invalid server address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a dotted settings path to the variable that sets it.
///
/// `provider.api_key` becomes `PARLEY_PROVIDER__API_KEY`.
pub fn to_env_var(field: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        field.split('.').collect::<Vec<_>>().join("__").to_uppercase()
    )
}

/// Recover the settings path from a serde "missing field" message.
///
/// Handles both the bare form and the form qualified with `for key`, which the
/// config crate produces for nested tables.
pub fn missing_field_path(message: &str) -> Option<String> {
    let field = between(message, "missing field `", "`")?;
    match between(message, "for key `", "`") {
        Some(key) if !key.is_empty() => Some(format!("{}.{}", key, field)),
        _ => Some(field.to_string()),
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let rest = &text[text.find(start)? + start.len()..];
    Some(&rest[..rest.find(end)?])
}
