//! 工具调度器
//!
//! 持有 ToolRegistry，invoke(tool_name, input) 计时调用工具并把任何失败（Err、panic、未知工具）
//! 收拢为 ToolResult::Error，绝不向调用方抛出；每次调用写入 tool_times、追加一条 Trace，
//! 并输出结构化审计日志（JSON）。

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;

use crate::core::{AgentError, Collector, TraceEvent};
use crate::tools::{ToolRegistry, ToolResult};

/// 工具调度器：解析工具名、隔离故障、计时
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// 执行指定工具；结果与耗时写入 collector
    pub async fn invoke(&self, tool_name: &str, input: &str, collector: &mut Collector) -> ToolResult {
        let start = Instant::now();
        let (result, outcome) = self.call(tool_name, input).await;
        let elapsed = start.elapsed();

        audit(tool_name, input, outcome, elapsed);

        collector.record_tool_time(tool_name, elapsed);
        collector.record(match &result {
            ToolResult::Success { .. } => TraceEvent::ToolOk {
                tool: tool_name.to_string(),
            },
            ToolResult::Error { message } => TraceEvent::ToolError {
                tool: tool_name.to_string(),
                message: message.clone(),
            },
        });
        result
    }

    async fn call(&self, tool_name: &str, input: &str) -> (ToolResult, &'static str) {
        let Some(tool) = self.registry.get(tool_name) else {
            let err = AgentError::UnknownTool(tool_name.to_string());
            return (ToolResult::error(err.to_string()), "unknown_tool");
        };

        match AssertUnwindSafe(tool.execute(input)).catch_unwind().await {
            Ok(Ok(output)) => (ToolResult::success(output), "ok"),
            Ok(Err(message)) => {
                let err = AgentError::ToolExecutionFailed(message);
                (ToolResult::error(err.to_string()), "error")
            }
            Err(panic) => {
                let err = AgentError::ToolExecutionFailed(format!(
                    "tool panicked: {}",
                    panic_message(panic.as_ref())
                ));
                (ToolResult::error(err.to_string()), "panic")
            }
        }
    }
}

fn audit(tool_name: &str, input: &str, outcome: &str, elapsed: Duration) {
    let audit = serde_json::json!({
        "event": "tool_audit",
        "tool": tool_name,
        "ok": outcome == "ok",
        "outcome": outcome,
        "duration_ms": elapsed.as_millis() as u64,
        "input_preview": input_preview(input),
    });
    tracing::info!(audit = %audit, "tool");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn input_preview(input: &str) -> String {
    if input.chars().count() > 200 {
        format!("{}...", input.chars().take(200).collect::<String>())
    } else {
        input.to_string()
    }
}
