use std::io::{self, IsTerminal, Write};

use otai_agent::{Assistant, EditorSource, GeminiClient, LineSource, ReaderSource};
use otai_core::config::{AppConfig, ConfigErrorKind, LoadOptions};
use tracing::info;

use crate::commands::{current_thread_runtime, CommandResult};
use crate::logging::init_logging;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_TERMINAL: u8 = 4;

pub fn run(options: LoadOptions) -> CommandResult {
    if io::stdin().is_terminal() {
        match EditorSource::new() {
            Ok(mut source) => run_with(options, &mut source, &mut io::stdout()),
            Err(error) => {
                eprintln!("terminal I/O failed: {error}");
                CommandResult::exit_only(EXIT_TERMINAL)
            }
        }
    } else {
        let stdin = io::stdin();
        let mut source = ReaderSource::new(stdin.lock());
        run_with(options, &mut source, &mut io::stdout())
    }
}

/// Runs a chat session over the given input and output.
pub fn run_with<S, W>(options: LoadOptions, source: &mut S, out: &mut W) -> CommandResult
where
    S: LineSource,
    W: Write,
{
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("FATAL: could not load configuration: {error}");
            if error.kind() == ConfigErrorKind::NotFound {
                eprintln!("hint: copy credentials.json.example to credentials.json and set api_key");
            }
            return CommandResult::exit_only(EXIT_CONFIG);
        }
    };
    init_logging(&config.logging);

    let client = match GeminiClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            eprintln!("FATAL: could not create model client: {error}");
            return CommandResult::exit_only(EXIT_RUNTIME);
        }
    };
    info!(
        event_name = "cli.chat.starting",
        model = %client.model(),
        response_format = ?config.assistant.response_format,
        "starting assistant"
    );

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("FATAL: {error:#}");
            return CommandResult::exit_only(EXIT_RUNTIME);
        }
    };

    let mut assistant = Assistant::new(client, config.assistant);
    match runtime.block_on(assistant.run(source, out)) {
        Ok(summary) => {
            info!(
                event_name = "cli.chat.finished",
                exchanges = summary.exchanges,
                failures = summary.failures,
                end_reason = ?summary.end_reason,
                "assistant finished"
            );
            CommandResult::exit_only(0)
        }
        Err(error) => {
            eprintln!("terminal I/O failed: {error}");
            CommandResult::exit_only(EXIT_TERMINAL)
        }
    }
}
