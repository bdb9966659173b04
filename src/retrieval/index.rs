//! 检索索引
//!
//! VectorIndex 是检索工具依赖的窄接口；InMemoryIndex 是进程内实现：
//! 挂了 EmbeddingProvider 时按余弦相似度打分，否则按关键词 Jaccard 相似度打分。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::llm::EmbeddingProvider;
use crate::retrieval::chunker::{Chunk, Chunker};

/// 检索命中
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub text: String,
    pub score: f32,
}

/// 检索索引接口
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// 返回按分数降序的前 top_k 个块
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, String>;
}

struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
    tokens: HashSet<String>,
}

/// 进程内索引
pub struct InMemoryIndex {
    chunker: Chunker,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryIndex {
    pub fn new(chunker: Chunker) -> Self {
        Self {
            chunker,
            embedder: None,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// 分块并索引文档；同一 doc_id 再次索引时替换旧块。返回块数
    pub async fn index_document(&self, doc_id: &str, text: &str) -> Result<usize, String> {
        let chunks = self.chunker.chunk(doc_id, text);
        let mut fresh = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = match &self.embedder {
                Some(e) => e.embed(&chunk.text).await?,
                None => Vec::new(),
            };
            let tokens = tokenize_to_set(&chunk.text);
            fresh.push(Entry {
                chunk,
                embedding,
                tokens,
            });
        }

        let added = fresh.len();
        let mut entries = self.entries.write().await;
        entries.retain(|e| e.chunk.doc_id != doc_id);
        entries.extend(fresh);
        tracing::info!(doc_id = %doc_id, chunks = added, "document indexed");
        Ok(added)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>, String> {
        let query_embedding = match &self.embedder {
            Some(e) => Some(e.embed(query).await?),
            None => None,
        };
        let query_tokens = tokenize_to_set(query);

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .map(|e| {
                let score = match &query_embedding {
                    Some(q) => cosine_similarity(q, &e.embedding),
                    None => jaccard_similarity(&query_tokens, &e.tokens),
                };
                ScoredChunk {
                    chunk_id: e.chunk.id.clone(),
                    doc_id: e.chunk.doc_id.clone(),
                    text: e.chunk.text.clone(),
                    score,
                }
            })
            .filter(|c| c.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// 小写、按非字母数字切分、丢弃单字符
pub fn tokenize_to_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() > 1)
        .map(String::from)
        .collect()
}

pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    inter / union
}

/// 余弦相似度
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
