//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENTFORGE__*` 覆盖（双下划线表示嵌套，
//! 如 `AGENTFORGE__LLM__PROVIDER=mock`、`AGENTFORGE__ENGINE__STRATEGY=state_machine`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::planner::{
    DEFAULT_COMPUTATION_KEYWORDS, DEFAULT_RETRIEVAL_KEYWORDS, DEFAULT_WEB_KEYWORDS,
};
use crate::engine::synthesis::{DEFAULT_EXCERPT_CHARS, DEFAULT_FALLBACK_ANSWER};
use crate::engine::Strategy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineSection,
    pub planner: PlannerConfig,
    pub llm: LlmSection,
    pub synthesis: SynthesisSection,
    pub tools: ToolsSection,
}

/// [engine] 段：驱动策略
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub strategy: Strategy,
}

/// [planner] 段：三类意图的关键词与对应工具名
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub retrieval_keywords: Vec<String>,
    pub computation_keywords: Vec<String>,
    pub web_keywords: Vec<String>,
    pub retrieval_tool: String,
    pub computation_tool: String,
    pub web_tool: String,
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|s| s.to_string()).collect()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            retrieval_keywords: to_strings(DEFAULT_RETRIEVAL_KEYWORDS),
            computation_keywords: to_strings(DEFAULT_COMPUTATION_KEYWORDS),
            web_keywords: to_strings(DEFAULT_WEB_KEYWORDS),
            retrieval_tool: "rag".to_string(),
            computation_tool: "calculator".to_string(),
            web_tool: "web_scraper".to_string(),
        }
    }
}

/// [llm] 段：后端选择、模型、超时与费率
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：ollama / openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读取 OPENAI_API_KEY
    pub api_key: Option<String>,
    /// 单次请求超时（秒），仅 Ollama 使用
    pub timeout_secs: u64,
    /// 自定义每 token 费率（USD）；未设置时按模型族估算
    pub cost_per_token: Option<f64>,
    /// 设置后检索索引改用该嵌入模型（OpenAI 兼容 /embeddings）
    pub embedding_model: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.1".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 120,
            cost_per_token: None,
            embedding_model: None,
        }
    }
}

/// [synthesis] 段：每个工具结果截取的字符数与兜底答案
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisSection {
    pub excerpt_chars: usize,
    pub fallback_answer: String,
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub retrieval: RetrievalSection,
    pub web: WebSection,
}

/// [tools.retrieval] 段：检索条数、命中阈值、分块参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    pub top_k: usize,
    pub hit_threshold: f32,
    pub max_words: usize,
    pub overlap_words: usize,
    /// 是否用 LLM 基于检索到的上下文生成回答
    pub answer_with_llm: bool,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: 5,
            hit_threshold: 0.5,
            max_words: 250,
            overlap_words: 40,
            answer_with_llm: true,
        }
    }
}

/// [tools.web] 段：抓取 URL 的超时、最大字符数、允许的域名白名单（空表示不限制）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub timeout_secs: u64,
    pub max_result_chars: usize,
    pub allowed_domains: Vec<String>,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_result_chars: 1500,
            allowed_domains: Vec::new(),
        }
    }
}

/// 加载配置：config/default.toml（若存在）→ 指定文件 → AGENTFORGE__* 环境变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AGENTFORGE")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("tools.web.allowed_domains")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.engine.strategy, Strategy::Linear);
        assert_eq!(cfg.planner.retrieval_tool, "rag");
        assert_eq!(cfg.synthesis.excerpt_chars, 800);
        assert_eq!(cfg.tools.retrieval.top_k, 5);
        assert_eq!(cfg.tools.web.timeout_secs, 10);
        assert_eq!(cfg.tools.web.max_result_chars, 1500);
        assert!(cfg.tools.web.allowed_domains.is_empty());
    }

    #[test]
    fn test_load_from_file_overrides_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[engine]
strategy = "state_machine"

[llm]
provider = "mock"

[planner]
web_tool = "browser"

[tools.web]
allowed_domains = ["docs.rs"]
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.engine.strategy, Strategy::StateMachine);
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.planner.web_tool, "browser");
        assert_eq!(cfg.planner.retrieval_tool, "rag");
        assert_eq!(cfg.tools.web.allowed_domains, vec!["docs.rs".to_string()]);
        assert_eq!(cfg.tools.web.max_result_chars, 1500);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_strategy_accepts_cli_spellings() {
        for spelling in ["state-machine", "fsm", "state_machine"] {
            let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
            writeln!(file, "[engine]\nstrategy = \"{spelling}\"").unwrap();
            let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
            assert_eq!(cfg.engine.strategy, Strategy::StateMachine, "{spelling}");
        }
    }

    #[test]
    fn test_bad_strategy_is_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[engine]\nstrategy = \"parallel\"").unwrap();
        assert!(load_config(Some(file.path().to_path_buf())).is_err());
    }
}
