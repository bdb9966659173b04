//! 检索工具（RAG）
//!
//! 在 VectorIndex 上检索 top_k 个块，附带相似度 / 命中率 / ROUGE-L 统计；
//! 配置了 LLM 时再基于检索到的上下文生成一段回答。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::llm::LlmClient;
use crate::retrieval::{hit_rate, rouge_l, ScoreStats, VectorIndex};
use crate::tools::{Tool, ToolOutput};

/// 上下文最大字符数，超出截断
const MAX_CONTEXT_CHARS: usize = 4000;

fn build_rag_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant. Use only the information in the context to answer the question.\n\
         If the answer is not in the context, say \"The context does not contain enough information.\"\n\
         \n\
         Context:\n\
         ----------------\n\
         {context}\n\
         ----------------\n\
         \n\
         Question: {question}\n\
         \n\
         Give a clear and direct answer."
    )
}

/// 检索工具
pub struct RetrievalTool {
    name: String,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    hit_threshold: f32,
    answerer: Option<Arc<dyn LlmClient>>,
}

impl RetrievalTool {
    pub fn new(index: Arc<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            name: "rag".to_string(),
            index,
            top_k,
            hit_threshold: 0.5,
            answerer: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_hit_threshold(mut self, threshold: f32) -> Self {
        self.hit_threshold = threshold;
        self
    }

    /// 挂载用于生成回答的 LLM
    pub fn with_answerer(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.answerer = Some(llm);
        self
    }

    async fn answer(&self, question: &str, context: &str) -> Option<String> {
        let llm = self.answerer.as_ref()?;
        if context.is_empty() {
            return None;
        }
        let prompt = build_rag_prompt(question, context);
        match llm.complete(&prompt).await {
            Ok(c) if !c.text.trim().is_empty() => Some(c.text.trim().to_string()),
            Ok(_) => {
                tracing::warn!(tool = %self.name, "retrieval answer was empty");
                None
            }
            Err(e) => {
                tracing::warn!(tool = %self.name, error = %e, "retrieval answer failed");
                None
            }
        }
    }
}

#[async_trait]
impl Tool for RetrievalTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Search the ingested documents for chunks relevant to the input and summarize them."
    }

    async fn execute(&self, input: &str) -> Result<ToolOutput, String> {
        let hits = self
            .index
            .search(input, self.top_k)
            .await
            .map_err(|e| format!("RAG_ERROR: {e}"))?;

        let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
        let rouge: Vec<f32> = hits.iter().map(|h| rouge_l(input, &h.text)).collect();

        let results: Vec<_> = hits
            .iter()
            .zip(&rouge)
            .map(|(h, r)| {
                json!({
                    "text": h.text,
                    "score": h.score,
                    "doc_id": h.doc_id,
                    "chunk_id": h.chunk_id,
                    "rouge_l": r,
                })
            })
            .collect();

        let mut context = hits
            .iter()
            .map(|h| h.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if context.chars().count() > MAX_CONTEXT_CHARS {
            context = context.chars().take(MAX_CONTEXT_CHARS).collect();
            context.push_str("\n...[trimmed]");
        }

        tracing::debug!(tool = %self.name, hits = hits.len(), "retrieval");

        let mut record = json!({
            "results": results,
            "stats": {
                "similarity": ScoreStats::from_scores(&scores),
                "hit_rate": hit_rate(&scores, self.hit_threshold),
                "rouge_l": ScoreStats::from_scores(&rouge),
            },
        });
        if let Some(answer) = self.answer(input, &context).await {
            record["answer"] = json!(answer);
        }
        Ok(ToolOutput::Record(record))
    }
}
