pub mod dataset;
pub mod error;
pub mod eval;
pub mod memory;
pub mod prompt;
pub mod providers;
pub mod types;

pub use dataset::{Dialogue, DialogueTurn};
pub use error::LLMError;
pub use eval::extract::{coerce_numeric, extract, Extraction, ParsedAnswer};
pub use eval::report::{AggregateResult, DialogueResult, ErrorKind, RunReport, TurnResult};
pub use eval::runner::{DialogueEvaluator, EvalConfig, EvalError};
pub use memory::ConversationMemory;
pub use providers::LLMProvider;
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, MessageRole, TokenUsage,
};
