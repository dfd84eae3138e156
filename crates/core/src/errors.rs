use thiserror::Error;

/// Failure of a single prompt/response exchange. Never fatal to the session.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("request to the model provider timed out")]
    Timeout,
    #[error("authentication with the model provider failed: {message}")]
    Authentication { message: String },
    #[error("rate limited by the model provider: {message}")]
    RateLimited { message: String },
    #[error("model provider returned status {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("model provider returned an empty completion")]
    EmptyCompletion,
    #[error("could not decode provider response: {0}")]
    InvalidResponse(String),
    #[error("model reply is not a valid command plan: {0}")]
    InvalidPlan(String),
}

impl ExchangeError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = summarize_body(body);
        match status {
            401 | 403 => Self::Authentication { message },
            429 => Self::RateLimited { message },
            408 | 504 => Self::Timeout,
            _ => Self::Provider { status, message },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited { .. } | Self::Transport(_) => true,
            Self::Provider { status, .. } => *status >= 500,
            Self::Authentication { .. }
            | Self::EmptyCompletion
            | Self::InvalidResponse(_)
            | Self::InvalidPlan(_) => false,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Authentication { .. } => "authentication",
            Self::RateLimited { .. } => "rate_limited",
            Self::Provider { .. } => "provider",
            Self::Transport(_) => "transport",
            Self::EmptyCompletion => "empty_completion",
            Self::InvalidResponse(_) => "invalid_response",
            Self::InvalidPlan(_) => "invalid_plan",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout => {
                "The model did not answer in time. Try again or raise timeout_secs.".to_string()
            }
            Self::Authentication { .. } => {
                "The model provider rejected the API key. Check api_key in your credentials file."
                    .to_string()
            }
            Self::RateLimited { .. } => {
                "The model provider is rate limiting requests. Wait a moment and retry.".to_string()
            }
            Self::Provider { status, message } => {
                format!("The model provider returned an error (status {status}): {message}")
            }
            Self::Transport(message) => format!("Could not reach the model provider: {message}"),
            Self::EmptyCompletion => "The model returned no text for that request.".to_string(),
            Self::InvalidResponse(_) => {
                "The model provider sent a response that could not be read.".to_string()
            }
            Self::InvalidPlan(message) => {
                format!("I couldn't turn that into a command plan: {message}")
            }
        }
    }
}

// Provider errors arrive as JSON `{"error": {"message": ...}}`; fall back to the raw body.
fn summarize_body(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body).ok().and_then(|value| {
        value.pointer("/error/message").and_then(|message| message.as_str()).map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return "no details provided".to_string();
    }

    const MAX_CHARS: usize = 300;
    if message.chars().count() > MAX_CHARS {
        let truncated: String = message.chars().take(MAX_CHARS).collect();
        return format!("{truncated}...");
    }
    message
}
