//! LLM 层：客户端抽象与实现（Ollama / OpenAI 兼容 / Mock）、嵌入、用量估算

pub mod cost;
pub mod embedding;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use cost::{estimate_cost, word_count, UsageEstimate};
pub use embedding::{create_embedder, EmbeddingProvider, OpenAiEmbedder};
pub use mock::MockLlmClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use traits::{Completion, LlmClient, LlmError};
