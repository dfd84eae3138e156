use async_trait::async_trait;
use otai_core::errors::ExchangeError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_instruction: Option<String>,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(system_instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { system_instruction: Some(system_instruction.into()), prompt: prompt.into() }
    }

    pub fn prompt_only(prompt: impl Into<String>) -> Self {
        Self { system_instruction: None, prompt: prompt.into() }
    }
}

/// A hosted text-completion provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExchangeError>;
}

