use std::env;
use std::path::Path;

use otai_core::config::{read_document, resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::commands::CommandResult;

struct Field<'a> {
    key: &'static str,
    file_keys: &'static [&'static str],
    env_key: &'static str,
    overridden: bool,
    value: &'a str,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc =
        config_file_path.as_deref().and_then(|path| read_document(path).ok());
    let overrides = &options.overrides;

    let api_key = redact_key(config.llm.api_key.expose_secret());
    let timeout_secs = config.llm.timeout_secs.to_string();
    let max_retries = config.llm.max_retries.to_string();
    let response_format = format!("{:?}", config.assistant.response_format).to_ascii_lowercase();
    let exit_commands = config.assistant.exit_commands.join(", ");
    let log_format = format!("{:?}", config.logging.format).to_ascii_lowercase();

    let fields = [
        Field {
            key: "api_key",
            file_keys: &["api_key", "gemini_api_key"],
            env_key: "OTAI_API_KEY",
            overridden: false,
            value: &api_key,
        },
        Field {
            key: "model_name",
            file_keys: &["model_name", "model"],
            env_key: "OTAI_MODEL",
            overridden: overrides.model.is_some(),
            value: &config.llm.model,
        },
        Field {
            key: "endpoint",
            file_keys: &["endpoint"],
            env_key: "OTAI_ENDPOINT",
            overridden: overrides.endpoint.is_some(),
            value: &config.llm.endpoint,
        },
        Field {
            key: "timeout_secs",
            file_keys: &["timeout_secs"],
            env_key: "OTAI_TIMEOUT_SECS",
            overridden: false,
            value: &timeout_secs,
        },
        Field {
            key: "max_retries",
            file_keys: &["max_retries"],
            env_key: "OTAI_MAX_RETRIES",
            overridden: false,
            value: &max_retries,
        },
        Field {
            key: "device_model",
            file_keys: &["device_model"],
            env_key: "OTAI_DEVICE_MODEL",
            overridden: overrides.device_model.is_some(),
            value: &config.assistant.device_model,
        },
        Field {
            key: "response_format",
            file_keys: &["response_format"],
            env_key: "OTAI_RESPONSE_FORMAT",
            overridden: overrides.response_format.is_some(),
            value: &response_format,
        },
        Field {
            key: "exit_commands",
            file_keys: &["exit_commands"],
            env_key: "",
            overridden: false,
            value: &exit_commands,
        },
        Field {
            key: "log_level",
            file_keys: &["log_level"],
            env_key: "OTAI_LOG_LEVEL",
            overridden: overrides.log_level.is_some(),
            value: &config.logging.level,
        },
        Field {
            key: "log_format",
            file_keys: &["log_format"],
            env_key: "OTAI_LOG_FORMAT",
            overridden: false,
            value: &log_format,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, field.value, source));
    }

    CommandResult::text(lines.join("\n"))
}

fn field_source(
    field: &Field<'_>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if field.overridden {
        return "flag".to_string();
    }

    if !field.env_key.is_empty()
        && env::var(field.env_key).is_ok_and(|value| !value.trim().is_empty())
    {
        return format!("env ({})", field.env_key);
    }

    if let Some(doc) = config_file_doc {
        if field.file_keys.iter().any(|key| doc.get(key).is_some()) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if trimmed.chars().count() > 8 {
        let prefix: String = trimmed.chars().take(4).collect();
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::redact_key;

    #[test]
    fn long_keys_keep_a_short_prefix() {
        assert_eq!(redact_key("AIzaSyD-very-secret"), "AIza***");
    }

    #[test]
    fn short_keys_are_fully_redacted() {
        assert_eq!(redact_key("abc123"), "<redacted>");
        assert_eq!(redact_key("  "), "<empty>");
    }
}
