pub mod config;
pub mod errors;
pub mod plan;
pub mod prompts;

pub use config::{AppConfig, ConfigError, ConfigErrorKind, LoadOptions, ResponseFormat};
pub use errors::ExchangeError;
pub use plan::{CommandPlan, QueryType};
