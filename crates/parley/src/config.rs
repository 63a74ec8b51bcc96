//! Settings of the command-line program, read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use parley_core::ProtocolKind;

/// The default address of the OpenAI-compatible backend.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:1337/v1";
/// The default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// An environment variable holds a value that cannot be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {key}: {value:?} ({reason})")]
pub struct ConfigError {
    key: &'static str,
    value: String,
    reason: String,
}

impl ConfigError {
    /// Returns the name of the offending variable.
    #[inline]
    pub fn key(&self) -> &str {
        self.key
    }
}

/// Settings of the command-line program.
#[derive(Clone, Debug, PartialEq)]
pub struct CliConfig {
    /// Base URL of the backend, `PARLEY_BASE_URL`.
    pub base_url: String,
    /// Model identifier, `PARLEY_MODEL`.
    pub model: String,
    /// Wire protocol, `PARLEY_PROTOCOL` (`json` or `tagged`).
    pub protocol: ProtocolKind,
    /// Turn cap of a single exchange, `PARLEY_MAX_TURNS`.
    pub max_turns: Option<usize>,
    /// Sampling temperature, `PARLEY_TEMPERATURE`.
    pub temperature: Option<f32>,
    /// Timeout of each backend request, `PARLEY_TIMEOUT_SECS`.
    pub timeout: Option<Duration>,
    /// Where the conversation is saved on exit, `PARLEY_HISTORY_FILE`.
    pub history_file: Option<PathBuf>,
    /// Where the system prompt is saved on exit, `PARLEY_PROMPT_FILE`.
    pub prompt_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            protocol: ProtocolKind::default(),
            max_turns: None,
            temperature: None,
            timeout: None,
            history_file: None,
            prompt_file: None,
        }
    }
}

impl CliConfig {
    /// Reads the settings from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the settings through `lookup`. Unset and empty variables take
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(base_url) = get("PARLEY_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(model) = get("PARLEY_MODEL") {
            config.model = model;
        }
        let protocol = parse("PARLEY_PROTOCOL", get("PARLEY_PROTOCOL"))?;
        if let Some(protocol) = protocol {
            config.protocol = protocol;
        }
        config.max_turns = parse("PARLEY_MAX_TURNS", get("PARLEY_MAX_TURNS"))?;
        if config.max_turns == Some(0) {
            return Err(ConfigError {
                key: "PARLEY_MAX_TURNS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        config.temperature =
            parse("PARLEY_TEMPERATURE", get("PARLEY_TEMPERATURE"))?;
        let timeout_secs: Option<u64> =
            parse("PARLEY_TIMEOUT_SECS", get("PARLEY_TIMEOUT_SECS"))?;
        if timeout_secs == Some(0) {
            return Err(ConfigError {
                key: "PARLEY_TIMEOUT_SECS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        config.timeout = timeout_secs.map(Duration::from_secs);
        config.history_file = get("PARLEY_HISTORY_FILE").map(PathBuf::from);
        config.prompt_file = get("PARLEY_PROMPT_FILE").map(PathBuf::from);
        Ok(config)
    }
}

fn parse<T>(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let Some(value) = value else {
        return Ok(None);
    };
    match value.parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => Err(ConfigError {
            key,
            reason: err.to_string(),
            value,
        }),
    }
}
