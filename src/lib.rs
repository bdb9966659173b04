//! AgentForge - 智能体编排核心
//!
//! 模块划分：
//! - **agent**: 按配置装配 Engine（LLM、检索索引、内置工具）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、运行状态、Trace 与 Metrics 收集器
//! - **engine**: Planner、线性 / 状态机驱动器、合成阶段
//! - **llm**: LLM 客户端抽象与实现（Ollama / OpenAI 兼容 / Mock）、嵌入、用量估算
//! - **observability**: tracing 初始化
//! - **retrieval**: 文档分块、进程内检索索引、检索统计
//! - **tools**: 工具注册表、调度器与内置工具（检索、计算器、网页抓取）

pub mod agent;
pub mod config;
pub mod core;
pub mod engine;
pub mod llm;
pub mod observability;
pub mod retrieval;
pub mod tools;

pub use engine::{Engine, RunResult, Strategy};
