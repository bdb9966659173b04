//! 合成阶段：工具结果 → 最终 prompt → LLM → 面向用户的答案
//!
//! 每个工具结果截取固定字符数拼进 prompt，保证 prompt 大小有界；
//! 后端失败或返回空文本时给出固定的兜底答案与零用量，不向上传播。

use std::sync::Arc;

use crate::core::{AgentError, ToolResults};
use crate::llm::{estimate_cost, word_count, LlmClient, UsageEstimate};

pub const DEFAULT_EXCERPT_CHARS: usize = 800;
pub const DEFAULT_FALLBACK_ANSWER: &str = "Sorry, the model could not generate an answer right now.";

/// 构建最终 prompt（纯函数：相同输入得到逐字节相同的输出）
pub fn build_final_prompt(task: &str, tool_results: &ToolResults, excerpt_chars: usize) -> String {
    let mut summary = String::new();
    for entry in tool_results.iter() {
        let excerpt: String = entry.result.to_string().chars().take(excerpt_chars).collect();
        summary.push_str(&format!(
            "\n[{} OUTPUT]\n{}\n",
            entry.tool.to_uppercase(),
            excerpt
        ));
    }

    let prompt = format!(
        "You are an AI agent. Use the tool outputs to answer the question.\n\n\
         If tools do not give enough information, say:\n\
         \"The tools do not contain enough information.\"\n\n\
         User question:\n{task}\n\n\
         Tool results:\n{summary}\n\n\
         Give a clear and direct final answer."
    );
    prompt.trim().to_string()
}

/// 合成器：持有 LLM 后端与截断 / 兜底设置
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    excerpt_chars: usize,
    fallback_answer: String,
    cost_per_token: Option<f64>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
            cost_per_token: None,
        }
    }

    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// 空字符串会被忽略，兜底答案始终非空
    pub fn with_fallback_answer(mut self, answer: impl Into<String>) -> Self {
        let answer = answer.into();
        if !answer.trim().is_empty() {
            self.fallback_answer = answer;
        }
        self
    }

    pub fn with_cost_per_token(mut self, rate: Option<f64>) -> Self {
        self.cost_per_token = rate;
        self
    }

    pub fn fallback_answer(&self) -> &str {
        &self.fallback_answer
    }

    pub fn prompt(&self, task: &str, tool_results: &ToolResults) -> String {
        build_final_prompt(task, tool_results, self.excerpt_chars)
    }

    /// 返回 (答案, 用量估算)；永不失败
    pub async fn synthesize(&self, task: &str, tool_results: &ToolResults) -> (String, UsageEstimate) {
        let prompt = self.prompt(task, tool_results);

        let completion = match self.llm.complete(&prompt).await {
            Ok(c) if !c.text.trim().is_empty() => c,
            Ok(_) => return self.fallback(AgentError::SynthesisFailed("empty response".into())),
            Err(e) => return self.fallback(AgentError::SynthesisFailed(e.to_string())),
        };

        let answer = completion.text.trim().to_string();
        let input_tokens = completion.prompt_tokens.unwrap_or_else(|| word_count(&prompt));
        let output_tokens = completion.completion_tokens.unwrap_or_else(|| word_count(&answer));
        let cost = estimate_cost(self.llm.model(), input_tokens, output_tokens, self.cost_per_token);
        (answer, cost)
    }

    fn fallback(&self, err: AgentError) -> (String, UsageEstimate) {
        tracing::warn!(error = %err, model = %self.llm.model(), "synthesis degraded to fallback answer");
        (self.fallback_answer.clone(), UsageEstimate::zero())
    }
}
