//! The interactive assistant loop.
//!
//! One exchange at a time: read a line, send it with the command preamble,
//! wait for the reply, print it, repeat. A failed exchange is reported and the
//! loop keeps going; only an exit command or end of input stops it.

use std::io::{self, Write};

use otai_core::config::{AssistantConfig, ResponseFormat};
use otai_core::errors::ExchangeError;
use otai_core::plan::CommandPlan;
use otai_core::prompts;
use tracing::{info, warn};
use uuid::Uuid;

use crate::input::LineSource;
use crate::llm::{CompletionRequest, LlmClient};

pub const APP_NAME: &str = "OT-AI";
pub const INPUT_PROMPT: &str = "You: ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    ExitCommand,
    EndOfInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub exchanges: u32,
    pub failures: u32,
    pub end_reason: EndReason,
}

enum LoopState {
    AwaitingInput,
    Sending { user_text: String },
    AwaitingReply { request: CompletionRequest },
    Displaying { outcome: Result<String, ExchangeError> },
    Finished(EndReason),
}

pub struct Assistant<C> {
    client: C,
    config: AssistantConfig,
    device_model: String,
    session_id: String,
}

impl<C> Assistant<C>
where
    C: LlmClient,
{
    pub fn new(client: C, config: AssistantConfig) -> Self {
        let device_model = config.device_model.clone();
        Self { client, config, device_model, session_id: Uuid::new_v4().to_string() }
    }

    pub fn device_model(&self) -> &str {
        &self.device_model
    }

    pub async fn run<S, W>(&mut self, source: &mut S, out: &mut W) -> io::Result<SessionSummary>
    where
        S: LineSource,
        W: Write,
    {
        writeln!(out, "Welcome to the {APP_NAME} assistant ({}).", self.device_model)?;
        writeln!(out, "Describe what you want to configure. {}", self.exit_hint())?;
        out.flush()?;

        info!(
            event_name = "assistant.session.started",
            session_id = %self.session_id,
            device_model = %self.device_model,
            "assistant session started"
        );

        let mut exchanges = 0u32;
        let mut failures = 0u32;
        let mut state = LoopState::AwaitingInput;

        let end_reason = loop {
            state = match state {
                LoopState::AwaitingInput => match source.read_line(INPUT_PROMPT)? {
                    None => LoopState::Finished(EndReason::EndOfInput),
                    Some(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            LoopState::AwaitingInput
                        } else if self.config.is_exit_command(line) {
                            LoopState::Finished(EndReason::ExitCommand)
                        } else {
                            LoopState::Sending { user_text: line.to_string() }
                        }
                    }
                },
                LoopState::Sending { user_text } => {
                    if let Some(model) = detect_device_model(&user_text) {
                        if model != self.device_model {
                            writeln!(out, "{APP_NAME}: device model set to {model}.")?;
                            self.device_model = model;
                        }
                    }
                    LoopState::AwaitingReply { request: self.compose(&user_text) }
                }
                LoopState::AwaitingReply { request } => {
                    info!(
                        event_name = "assistant.exchange.sent",
                        session_id = %self.session_id,
                        device_model = %self.device_model,
                        prompt_chars = request.prompt.len(),
                        "prompt sent to model"
                    );
                    let outcome = self.client.complete(&request).await;
                    LoopState::Displaying { outcome: outcome.and_then(|reply| self.present(reply)) }
                }
                LoopState::Displaying { outcome } => {
                    match outcome {
                        Ok(text) => {
                            exchanges += 1;
                            write_verbatim(out, &text)?;
                            info!(
                                event_name = "assistant.exchange.completed",
                                session_id = %self.session_id,
                                reply_chars = text.len(),
                                "reply displayed"
                            );
                        }
                        Err(error) => {
                            failures += 1;
                            writeln!(out, "error: {}", error.user_message())?;
                            warn!(
                                event_name = "assistant.exchange.failed",
                                session_id = %self.session_id,
                                error_class = error.error_class(),
                                error = %error,
                                "exchange failed"
                            );
                        }
                    }
                    out.flush()?;
                    LoopState::AwaitingInput
                }
                LoopState::Finished(reason) => break reason,
            };
        };

        writeln!(out, "{APP_NAME}: Goodbye!")?;
        out.flush()?;

        info!(
            event_name = "assistant.session.ended",
            session_id = %self.session_id,
            exchanges,
            failures,
            end_reason = ?end_reason,
            "assistant session ended"
        );

        Ok(SessionSummary { exchanges, failures, end_reason })
    }

    /// Asks the model for a short answer to `question` from pasted device output.
    pub async fn extract_answer(
        &self,
        question: &str,
        device_output: &str,
    ) -> Result<String, ExchangeError> {
        let request =
            CompletionRequest::prompt_only(prompts::answer_extraction_prompt(question, device_output));
        let answer = self.client.complete(&request).await?;
        Ok(answer.trim().to_string())
    }

    fn compose(&self, user_text: &str) -> CompletionRequest {
        let preamble = match self.config.response_format {
            ResponseFormat::Text => prompts::command_preamble(&self.device_model),
            ResponseFormat::Plan => prompts::plan_preamble(&self.device_model),
        };
        CompletionRequest::new(preamble, prompts::user_turn(user_text))
    }

    fn present(&self, reply: String) -> Result<String, ExchangeError> {
        match self.config.response_format {
            ResponseFormat::Text => Ok(reply),
            ResponseFormat::Plan => CommandPlan::parse(&reply).map(|plan| plan.render()),
        }
    }

    fn exit_hint(&self) -> String {
        let quoted: Vec<String> =
            self.config.exit_commands.iter().map(|command| format!("'{}'", command.trim())).collect();
        format!("Type {} to end the session.", quoted.join(" or "))
    }
}

fn write_verbatim<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Picks a device model out of phrases like "connected to a cisco 3750".
///
/// The word after `cisco` must contain a digit, which keeps "cisco commands"
/// from being read as a model.
pub fn detect_device_model(text: &str) -> Option<String> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-'))
        .map(str::to_ascii_lowercase)
        .collect();

    words.windows(2).find_map(|pair| {
        let candidate = &pair[1];
        let looks_like_model = pair[0] == "cisco"
            && !matches!(candidate.as_str(), "over" | "on" | "port")
            && candidate.chars().any(|c| c.is_ascii_digit());
        looks_like_model.then(|| format!("Cisco {}", candidate.to_ascii_uppercase()))
    })
}
