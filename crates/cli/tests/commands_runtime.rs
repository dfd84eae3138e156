use std::env;
use std::fs;
use std::io::{self, Cursor};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use otai_agent::ReaderSource;
use otai_cli::commands::{chat, config, doctor, extract};
use otai_core::config::{ConfigOverrides, LoadOptions};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn chat_returns_config_failure_when_credentials_are_missing() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let mut source = ReaderSource::new(Cursor::new("exit\n"));
        let mut out = Vec::new();
        let result =
            chat::run_with(options_for(dir.path().join("credentials.json")), &mut source, &mut out);

        assert_eq!(result.exit_code, chat::EXIT_CONFIG, "expected config failure code");
        assert!(result.output.is_empty(), "fatal message belongs on stderr");
        assert!(out.is_empty(), "no banner before configuration loads");
    });
}

#[test]
fn chat_returns_config_failure_when_api_key_is_blank() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(dir.path(), r#"{"api_key": "   "}"#);
        let mut source = ReaderSource::new(Cursor::new("exit\n"));
        let mut out = Vec::new();
        let result = chat::run_with(options_for(path), &mut source, &mut out);

        assert_eq!(result.exit_code, chat::EXIT_CONFIG);
    });
}

#[test]
fn chat_exit_command_returns_success_without_contacting_provider() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind provider listener");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let endpoint = format!("http://{}/v1beta", listener.local_addr().expect("address"));

    with_env(&[("OTAI_ENDPOINT", &endpoint), ("OTAI_TIMEOUT_SECS", "1")], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(dir.path(), r#"{"api_key": "AIzaSyTestKey0123456789"}"#);
        let mut source = ReaderSource::new(Cursor::new("exit\n"));
        let mut out = Vec::new();

        let result = chat::run_with(options_for(path), &mut source, &mut out);
        assert_eq!(result.exit_code, 0, "exit command should end with a zero status");

        let transcript = String::from_utf8(out).expect("utf-8 transcript");
        assert!(transcript.ends_with("OT-AI: Goodbye!\n"));
        assert!(!transcript.contains("error:"));
    });

    match listener.accept() {
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => {}
        Ok(_) => panic!("no request should reach the provider"),
        Err(error) => panic!("unexpected accept error: {error}"),
    }
}

#[test]
fn chat_reports_failed_exchange_and_still_exits_cleanly_at_end_of_input() {
    let port = closed_port();
    with_env(&[("OTAI_ENDPOINT", &format!("http://127.0.0.1:{port}/v1beta"))], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(dir.path(), r#"{"api_key": "AIzaSyTestKey0123456789"}"#);
        let mut source = ReaderSource::new(Cursor::new("show vlan brief\n"));
        let mut out = Vec::new();

        let result = chat::run_with(options_for(path), &mut source, &mut out);
        assert_eq!(result.exit_code, 0);

        let transcript = String::from_utf8(out).expect("utf-8 transcript");
        assert!(transcript.contains("error: "), "failed exchange should be reported inline");
        assert!(transcript.ends_with("OT-AI: Goodbye!\n"));
    });
}

#[test]
fn config_redacts_key_and_attributes_sources() {
    with_env(&[("OTAI_MODEL", "gemini-1.5-pro")], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(
            dir.path(),
            r#"{"api_key": "AIzaSyTestKey0123456789", "device_model": "Cisco 3750"}"#,
        );
        let result = config::run(&options_for(path.clone()));
        assert_eq!(result.exit_code, 0, "expected config listing to succeed");

        let output = &result.output;
        assert!(!output.contains("AIzaSyTestKey0123456789"), "raw key must never be printed");
        assert!(output.contains("- api_key = AIza***"));
        assert!(output.contains(&format!(
            "- device_model = Cisco 3750 (source: file ({}))",
            path.display()
        )));
        assert!(output.contains("- model_name = gemini-1.5-pro (source: env (OTAI_MODEL))"));
        assert!(output.contains("- timeout_secs = 30 (source: default)"));
    });
}

#[test]
fn config_flag_override_wins_over_env() {
    with_env(&[("OTAI_MODEL", "gemini-1.5-pro")], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(dir.path(), r#"{"api_key": "AIzaSyTestKey0123456789"}"#);
        let mut options = options_for(path);
        options.overrides.model = Some("gemini-2.5-flash".to_string());

        let result = config::run(&options);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("- model_name = gemini-2.5-flash (source: flag)"));
    });
}

#[test]
fn config_returns_structured_failure_without_file() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = config::run(&options_for(dir.path().join("missing.json")));
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_reports_config_failure_and_skips_provider_check() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = doctor::run(options_for(dir.path().join("missing.json")), true);
        assert_eq!(result.exit_code, 1, "expected doctor failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        let checks = payload["checks"].as_array().expect("checks array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert_eq!(checks[1]["name"], "provider_reachability");
        assert_eq!(checks[1]["status"], "skipped");
    });
}

#[test]
fn doctor_human_output_marks_unreachable_provider() {
    let port = closed_port();
    with_env(&[("OTAI_ENDPOINT", &format!("http://127.0.0.1:{port}/v1beta"))], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(dir.path(), r#"{"api_key": "AIzaSyTestKey0123456789"}"#);
        let result = doctor::run(options_for(path), false);
        assert_eq!(result.exit_code, 1);

        let mut lines = result.output.lines();
        assert_eq!(lines.next(), Some("doctor: one or more readiness checks failed"));
        assert_eq!(
            lines.next(),
            Some("- [ok] config_validation: configuration loaded and validated")
        );
        let provider = lines.next().unwrap_or_default();
        assert!(provider.starts_with("- [fail] provider_reachability:"), "got: {provider}");
    });
}

#[test]
fn extract_rejects_missing_output_file() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(dir.path(), r#"{"api_key": "AIzaSyTestKey0123456789"}"#);
        let result = extract::run(
            options_for(path),
            "What is the name of VLAN 100?",
            &dir.path().join("show-vlan.txt"),
        );
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "extract");
        assert_eq!(payload["error_class"], "read_output");
    });
}

#[test]
fn extract_rejects_blank_question_before_loading_config() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let result = extract::run(
            options_for(dir.path().join("missing.json")),
            "  ",
            &dir.path().join("show-vlan.txt"),
        );
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn extract_reports_transport_failure_as_exchange_error() {
    let port = closed_port();
    with_env(&[("OTAI_ENDPOINT", &format!("http://127.0.0.1:{port}/v1beta"))], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_credentials(dir.path(), r#"{"api_key": "AIzaSyTestKey0123456789"}"#);
        let output_path = dir.path().join("show-vlan.txt");
        fs::write(&output_path, "100  users  active  Gi1/0/1\n").expect("write output");

        let result = extract::run(options_for(path), "What is VLAN 100 called?", &output_path);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "extract");
        assert_eq!(payload["error_class"], "transport");
    });
}

fn options_for(path: PathBuf) -> LoadOptions {
    LoadOptions { config_path: Some(path), require_file: true, overrides: ConfigOverrides::default() }
}

fn write_credentials(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("credentials.json");
    fs::write(&path, contents).expect("write credentials");
    path
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "OTAI_API_KEY",
        "OTAI_MODEL",
        "OTAI_ENDPOINT",
        "OTAI_TIMEOUT_SECS",
        "OTAI_MAX_RETRIES",
        "OTAI_DEVICE_MODEL",
        "OTAI_RESPONSE_FORMAT",
        "OTAI_LOG_LEVEL",
        "OTAI_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
