use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_DEVICE_MODEL: &str = "Cisco 2960X";
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["credentials.json", "config/credentials.json"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub device_model: String,
    pub response_format: ResponseFormat,
    pub exit_commands: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// How the assistant presents a completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Print the model's reply verbatim.
    Text,
    /// Ask for a JSON command plan and render it.
    Plan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub device_model: Option<String>,
    pub response_format: Option<ResponseFormat>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: `{0}` (create it by copying credentials.json.example)")]
    NotFound(PathBuf),
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}` as JSON: {source}")]
    ParseJson { path: PathBuf, source: serde_json::Error },
    #[error("could not parse config file `{path}` as TOML: {source}")]
    ParseToml { path: PathBuf, source: toml::de::Error },
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("missing or empty value for required field `{field}`")]
    MissingField { field: &'static str },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Coarse classification used for exit reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigErrorKind {
    NotFound,
    Malformed,
    MissingField,
    Invalid,
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            Self::NotFound(_) => ConfigErrorKind::NotFound,
            Self::ReadFile { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ConfigErrorKind::NotFound
            }
            Self::ReadFile { source, .. } if source.kind() == std::io::ErrorKind::InvalidData => {
                ConfigErrorKind::Malformed
            }
            Self::ParseJson { .. }
            | Self::ParseToml { .. }
            | Self::MissingEnvInterpolation { .. }
            | Self::UnterminatedInterpolation => ConfigErrorKind::Malformed,
            Self::MissingField { .. } => ConfigErrorKind::MissingField,
            Self::ReadFile { .. } | Self::InvalidEnvOverride { .. } | Self::Validation(_) => {
                ConfigErrorKind::Invalid
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: String::new().into(),
                model: DEFAULT_MODEL.to_string(),
                endpoint: DEFAULT_ENDPOINT.to_string(),
                timeout_secs: 30,
                max_retries: 0,
            },
            assistant: AssistantConfig {
                device_model: DEFAULT_DEVICE_MODEL.to_string(),
                response_format: ResponseFormat::Text,
                exit_commands: vec!["exit".to_string(), "quit".to_string()],
            },
            logging: LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AssistantConfig {
    pub fn is_exit_command(&self, input: &str) -> bool {
        let input = input.trim();
        self.exit_commands.iter().any(|command| command.trim().eq_ignore_ascii_case(input))
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for ResponseFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "plan" => Ok(Self::Plan),
            other => Err(ConfigError::Validation(format!(
                "unsupported response format `{other}` (expected text|plan)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::NotFound(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(api_key) = patch.api_key.or(patch.gemini_api_key) {
            self.llm.api_key = secret_value(api_key);
        }
        if let Some(model) = patch.model_name.or(patch.model) {
            self.llm.model = model;
        }
        if let Some(endpoint) = patch.endpoint {
            self.llm.endpoint = endpoint;
        }
        if let Some(timeout_secs) = patch.timeout_secs {
            self.llm.timeout_secs = timeout_secs;
        }
        if let Some(max_retries) = patch.max_retries {
            self.llm.max_retries = max_retries;
        }

        if let Some(device_model) = patch.device_model {
            self.assistant.device_model = device_model;
        }
        if let Some(response_format) = patch.response_format {
            self.assistant.response_format = response_format;
        }
        if let Some(exit_commands) = patch.exit_commands {
            self.assistant.exit_commands = exit_commands;
        }

        if let Some(level) = patch.log_level {
            self.logging.level = level;
        }
        if let Some(format) = patch.log_format {
            self.logging.format = format;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("OTAI_API_KEY") {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("OTAI_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("OTAI_ENDPOINT") {
            self.llm.endpoint = value;
        }
        if let Some(value) = read_env("OTAI_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("OTAI_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("OTAI_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("OTAI_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("OTAI_DEVICE_MODEL") {
            self.assistant.device_model = value;
        }
        if let Some(value) = read_env("OTAI_RESPONSE_FORMAT") {
            self.assistant.response_format = value.parse()?;
        }

        if let Some(value) = read_env("OTAI_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("OTAI_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(model) = overrides.model {
            self.llm.model = model;
        }
        if let Some(endpoint) = overrides.endpoint {
            self.llm.endpoint = endpoint;
        }
        if let Some(device_model) = overrides.device_model {
            self.assistant.device_model = device_model;
        }
        if let Some(response_format) = overrides.response_format {
            self.assistant.response_format = response_format;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_assistant(&self.assistant)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Returns the config file that would be loaded, if any exists.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

/// Reads a config file as a generic document, for source attribution.
pub fn read_document(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let raw = read_interpolated(path)?;
    if is_toml(path) {
        toml::from_str::<serde_json::Value>(&raw)
            .map_err(|source| ConfigError::ParseToml { path: path.to_path_buf(), source })
    } else {
        serde_json::from_str::<serde_json::Value>(&raw)
            .map_err(|source| ConfigError::ParseJson { path: path.to_path_buf(), source })
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = read_interpolated(path)?;
    if is_toml(path) {
        toml::from_str::<ConfigPatch>(&raw)
            .map_err(|source| ConfigError::ParseToml { path: path.to_path_buf(), source })
    } else {
        serde_json::from_str::<ConfigPatch>(&raw)
            .map_err(|source| ConfigError::ParseJson { path: path.to_path_buf(), source })
    }
}

fn read_interpolated(path: &Path) -> Result<String, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    interpolate_env_vars(&raw)
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            push_escaped(&mut output, &value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

/// Interpolated values are escaped for a basic JSON or TOML string.
fn push_escaped(output: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            ch if ch.is_control() => output.push_str(&format!("\\u{:04x}", ch as u32)),
            ch => output.push(ch),
        }
    }
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::MissingField { field: "api_key" });
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("model_name must not be empty".to_string()));
    }

    let endpoint = llm.endpoint.trim();
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "endpoint must start with http:// or https://".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation("timeout_secs must be in range 1..=300".to_string()));
    }

    if llm.max_retries > 5 {
        return Err(ConfigError::Validation("max_retries must be in range 0..=5".to_string()));
    }

    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if assistant.device_model.trim().is_empty() {
        return Err(ConfigError::Validation("device_model must not be empty".to_string()));
    }

    if assistant.exit_commands.is_empty()
        || assistant.exit_commands.iter().any(|command| command.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "exit_commands must list at least one non-empty command".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "log_level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api_key: Option<String>,
    gemini_api_key: Option<String>,
    model_name: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    device_model: Option<String>,
    response_format: Option<ResponseFormat>,
    exit_commands: Option<Vec<String>>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
}
