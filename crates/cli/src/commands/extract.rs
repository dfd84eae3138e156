use std::fs;
use std::path::Path;

use otai_agent::{Assistant, GeminiClient};
use otai_core::config::{AppConfig, LoadOptions};
use tracing::warn;

use crate::commands::{current_thread_runtime, CommandResult};
use crate::logging::init_logging;

pub fn run(options: LoadOptions, question: &str, output_path: &Path) -> CommandResult {
    if question.trim().is_empty() {
        return CommandResult::failure("extract", "invalid_input", "question must not be empty", 2);
    }

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "extract",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config.logging);

    let device_output = match fs::read_to_string(output_path) {
        Ok(contents) if !contents.trim().is_empty() => contents,
        Ok(_) => {
            return CommandResult::failure(
                "extract",
                "invalid_input",
                format!("`{}` is empty", output_path.display()),
                2,
            );
        }
        Err(error) => {
            return CommandResult::failure(
                "extract",
                "read_output",
                format!("could not read `{}`: {error}", output_path.display()),
                2,
            );
        }
    };

    let client = match GeminiClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("extract", "runtime_init", error.to_string(), 3);
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("extract", "runtime_init", format!("{error:#}"), 3);
        }
    };

    let assistant = Assistant::new(client, config.assistant);
    match runtime.block_on(assistant.extract_answer(question, &device_output)) {
        Ok(answer) => CommandResult::text(answer),
        Err(error) => {
            warn!(
                event_name = "cli.extract.failed",
                error_class = error.error_class(),
                error = %error,
                "answer extraction failed"
            );
            CommandResult::failure("extract", error.error_class(), error.user_message(), 5)
        }
    }
}
