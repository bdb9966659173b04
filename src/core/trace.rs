//! Trace 与 Metrics 收集器
//!
//! 不是独立的执行组件，而是贯穿各阶段的输出累加器：Planner、调度器、合成阶段各自追加事件，
//! 引擎在合成结束后写入 total_run_time。运行结束后以只读形式交给调用方。

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::core::state::EngineState;
use crate::llm::UsageEstimate;

/// 生命周期事件；Display 输出即 Trace 中的可读字符串
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// 计划已生成
    Planner,
    /// 工具成功返回
    ToolOk { tool: String },
    /// 工具失败（含未知工具）
    ToolError { tool: String, message: String },
    /// 状态机迁移（仅状态机驱动器记录）
    Transition { from: EngineState, to: EngineState },
    /// 最终合成调用已完成
    FinalLlm,
}

impl TraceEvent {
    pub fn is_transition(&self) -> bool {
        matches!(self, TraceEvent::Transition { .. })
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Planner => write!(f, "planner"),
            TraceEvent::ToolOk { tool } => write!(f, "{tool} → OK"),
            TraceEvent::ToolError { tool, message } => write!(f, "{tool} → ERROR: {message}"),
            TraceEvent::Transition { from, to } => write!(f, "state: {from} → {to}"),
            TraceEvent::FinalLlm => write!(f, "final_llm"),
        }
    }
}

/// 只追加的有序事件日志
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 去掉状态迁移标签后的生命周期事件（用于比较两种驱动器）
    pub fn lifecycle(&self) -> Vec<TraceEvent> {
        self.events
            .iter()
            .filter(|e| !e.is_transition())
            .cloned()
            .collect()
    }

    /// 渲染为字符串序列（RunResult.steps）
    pub fn to_strings(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }
}

/// 运行指标：各工具耗时（秒）、总耗时（秒）、合成调用的用量估算
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub tool_times: BTreeMap<String, f64>,
    pub total_run_time: f64,
    pub llm_cost: UsageEstimate,
}

/// 单次运行的 Trace + Metrics 累加器，由 ExecutionState 独占持有
#[derive(Debug, Clone, Default)]
pub struct Collector {
    trace: Trace,
    metrics: Metrics,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: TraceEvent) {
        tracing::debug!(event = %event, "trace");
        self.trace.push(event);
    }

    /// 同名工具再次执行时覆盖上一次耗时
    pub fn record_tool_time(&mut self, tool: &str, elapsed: Duration) {
        self.metrics
            .tool_times
            .insert(tool.to_string(), elapsed.as_secs_f64());
    }

    pub fn set_llm_cost(&mut self, cost: UsageEstimate) {
        self.metrics.llm_cost = cost;
    }

    pub fn stamp_total_run_time(&mut self, elapsed: Duration) {
        self.metrics.total_run_time = elapsed.as_secs_f64();
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn into_parts(self) -> (Trace, Metrics) {
        (self.trace, self.metrics)
    }
}
