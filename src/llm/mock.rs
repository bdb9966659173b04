//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 取 prompt 中 "User question:" 之后的一行作为问题，回显一段确定性的回答。

use async_trait::async_trait;

use crate::llm::{Completion, LlmClient, LlmError};

/// Mock 客户端：确定性回显
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    model: String,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            model: "mock".to_string(),
        }
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn extract_question(prompt: &str) -> &str {
    let mut lines = prompt.lines();
    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("User question:") {
            if let Some(q) = lines.find(|l| !l.trim().is_empty()) {
                return q.trim();
            }
        }
    }
    prompt.lines().find(|l| !l.trim().is_empty()).unwrap_or("(no input)").trim()
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let question = extract_question(prompt);
        Ok(Completion::text(format!("Mock answer for: {question}")))
    }
}
