//! Agent 运行时装配
//!
//! 按配置创建 LLM 后端、检索索引与三个内置工具，组装成 Engine。
//! 所有依赖显式注入，不使用全局单例；调用方持有 Engine 即可反复 run。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::engine::{Engine, KeywordPlanner, Synthesizer};
use crate::llm::{create_embedder, LlmClient, MockLlmClient, OllamaClient, OpenAiClient};
use crate::retrieval::{Chunker, ChunkingConfig, InMemoryIndex, VectorIndex};
use crate::tools::{CalculatorTool, RetrievalTool, ToolDispatcher, ToolRegistry, WebFetchTool};

/// 按 [llm].provider 选择后端；openai 缺少 API Key 或 provider 未知时退回 Mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let model = cfg.llm.model.as_str();
    let base = cfg.llm.base_url.as_deref();

    match provider.as_str() {
        "ollama" => {
            tracing::info!("Using Ollama LLM ({})", model);
            Arc::new(OllamaClient::new(base, model, cfg.llm.timeout_secs))
        }
        "openai" => {
            let key = cfg
                .llm
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.is_empty());
            match key {
                Some(key) => {
                    tracing::info!("Using OpenAI LLM ({})", model);
                    Arc::new(OpenAiClient::new(base, model, Some(&key)))
                }
                None => {
                    tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
                    Arc::new(MockLlmClient::new())
                }
            }
        }
        "mock" => Arc::new(MockLlmClient::new()),
        other => {
            tracing::warn!(provider = %other, "unknown LLM provider, using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
    }
}

/// 创建进程内检索索引；配置了 embedding_model 且有 API Key 时按向量打分
pub fn create_index(cfg: &AppConfig) -> Arc<InMemoryIndex> {
    let chunker = Chunker::new(ChunkingConfig {
        max_words: cfg.tools.retrieval.max_words,
        overlap_words: cfg.tools.retrieval.overlap_words,
    });
    let mut index = InMemoryIndex::new(chunker);
    if let Some(model) = cfg.llm.embedding_model.as_deref() {
        if let Some(embedder) =
            create_embedder(cfg.llm.base_url.as_deref(), model, cfg.llm.api_key.as_deref())
        {
            tracing::info!("Using embeddings ({})", model);
            index = index.with_embedder(embedder);
        }
    }
    Arc::new(index)
}

/// 注册三个内置工具（检索 / 计算 / 网页抓取），名称取自 [planner] 段
pub fn create_registry(
    cfg: &AppConfig,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
) -> ToolRegistry {
    let retrieval_cfg = &cfg.tools.retrieval;
    let mut rag = RetrievalTool::new(index, retrieval_cfg.top_k)
        .with_name(cfg.planner.retrieval_tool.clone())
        .with_hit_threshold(retrieval_cfg.hit_threshold);
    if retrieval_cfg.answer_with_llm {
        rag = rag.with_answerer(llm);
    }

    let mut tools = ToolRegistry::new();
    tools.register(rag);
    tools.register(CalculatorTool::new(cfg.planner.computation_tool.clone()));
    tools.register(WebFetchTool::new(
        cfg.planner.web_tool.clone(),
        cfg.tools.web.allowed_domains.clone(),
        cfg.tools.web.timeout_secs,
        cfg.tools.web.max_result_chars,
    ));
    tools
}

/// 按配置组装 Engine
pub fn build_engine(cfg: &AppConfig, index: Arc<dyn VectorIndex>) -> Engine {
    let llm = create_llm_from_config(cfg);
    let registry = create_registry(cfg, index, llm.clone());
    tracing::debug!(tools = ?registry.tool_names(), "tools registered");

    let synthesizer = Synthesizer::new(llm)
        .with_excerpt_chars(cfg.synthesis.excerpt_chars)
        .with_fallback_answer(cfg.synthesis.fallback_answer.clone())
        .with_cost_per_token(cfg.llm.cost_per_token);

    Engine::new(
        Arc::new(KeywordPlanner::from_config(&cfg.planner)),
        ToolDispatcher::new(registry),
        synthesizer,
    )
    .with_strategy(cfg.engine.strategy)
}
