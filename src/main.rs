//! AgentForge 命令行入口
//!
//! 初始化日志、加载配置、可选地把本地文件索引进检索库，然后对一条任务执行 Engine::run，
//! 以格式化 JSON 输出 RunResult。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use agentforge::agent::{build_engine, create_index};
use agentforge::config::load_config;
use agentforge::engine::Strategy;

#[derive(Parser, Debug)]
#[command(name = "agentforge", version)]
#[command(about = "Plan tool calls for a task, run them and synthesize an answer")]
struct Cli {
    /// Config file (TOML), applied on top of config/default.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Execution driver: linear | state-machine
    #[arg(long)]
    engine: Option<Strategy>,
    /// Text file to index for retrieval (repeatable)
    #[arg(long)]
    ingest: Vec<PathBuf>,
    /// The task to run
    #[arg(required = true, num_args = 1..)]
    task: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agentforge::observability::init();

    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    if let Some(strategy) = cli.engine {
        cfg.engine.strategy = strategy;
    }

    let index = create_index(&cfg);
    for path in &cli.ingest {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        index
            .index_document(&doc_id, &text)
            .await
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to index {}", path.display()))?;
    }

    let engine = build_engine(&cfg, index);
    let task = cli.task.join(" ");
    let result = engine.run(&task).await.context("Agent run failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
