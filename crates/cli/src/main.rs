use std::process::ExitCode;

fn main() -> ExitCode {
    otai_cli::run()
}
