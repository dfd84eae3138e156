//! Assistant runtime: turns free-text requests into suggested Cisco IOS commands.
//!
//! - `llm` defines the provider seam (`LlmClient`)
//! - `gemini` implements it over the Gemini REST API
//! - `input` abstracts where user lines come from (terminal or reader)
//! - `session` runs the read / send / display loop
//!
//! The model only suggests commands. Nothing is sent to a device.

pub mod gemini;
pub mod input;
pub mod llm;
pub mod session;

pub use gemini::GeminiClient;
pub use input::{EditorSource, LineSource, ReaderSource};
pub use llm::{CompletionRequest, LlmClient};
pub use session::{Assistant, EndReason, SessionSummary};
