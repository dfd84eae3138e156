pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use otai_core::config::{ConfigOverrides, LoadOptions, ResponseFormat};

#[derive(Debug, Parser)]
#[command(
    name = "otai",
    version,
    about = "Suggest Cisco IOS commands from plain-language requests",
    long_about = "Interactive assistant that sends your request to a hosted LLM and prints the \
                  suggested Cisco IOS-style commands. Nothing is sent to a device.",
    after_help = "Examples:\n  otai\n  otai --config credentials.json chat --format plan\n  otai doctor --json\n  otai extract --question \"What is VLAN 100 called?\" --output show-vlan.txt"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Credentials file (default: credentials.json, then config/credentials.json)"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the model name")]
    model: Option<String>,
    #[arg(long, global = true, value_name = "LEVEL", help = "Override the log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start the interactive assistant (default)")]
    Chat {
        #[arg(long, value_name = "text|plan", help = "Print replies verbatim or as a command plan")]
        format: Option<ResponseFormat>,
        #[arg(long, value_name = "MODEL", help = "Device model named in the prompt, e.g. \"Cisco 3750\"")]
        device_model: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate configuration and model provider reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Extract a short answer from saved `show` command output")]
    Extract {
        #[arg(long, help = "The question to answer")]
        question: String,
        #[arg(long, value_name = "FILE", help = "File holding the raw device output")]
        output: PathBuf,
    },
}

impl Cli {
    fn load_options(&self, overrides: ConfigOverrides) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: true,
            overrides: ConfigOverrides {
                model: self.model.clone(),
                log_level: self.log_level.clone(),
                ..overrides
            },
        }
    }
}

pub fn run() -> ExitCode {
    let mut cli = Cli::parse();

    let command =
        cli.command.take().unwrap_or(Command::Chat { format: None, device_model: None });
    let result = match command {
        Command::Chat { format, device_model } => commands::chat::run(cli.load_options(
            ConfigOverrides { response_format: format, device_model, ..ConfigOverrides::default() },
        )),
        Command::Config => commands::config::run(&cli.load_options(ConfigOverrides::default())),
        Command::Doctor { json } => {
            commands::doctor::run(cli.load_options(ConfigOverrides::default()), json)
        }
        Command::Extract { question, output } => commands::extract::run(
            cli.load_options(ConfigOverrides::default()),
            &question,
            &output,
        ),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
