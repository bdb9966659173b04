//! 运行状态：EngineState（状态机阶段）与 ExecutionState（单次运行的可变上下文）
//!
//! ExecutionState 每次运行新建、由该运行独占，结束后投影为 RunResult 并丢弃。
//! 不变量在修改边界上检查：游标单调不减且不超过计划长度；最终答案只能在计划走完后写一次。

use std::fmt;

use serde::Serialize;

use crate::core::trace::{Collector, Metrics, Trace};
use crate::core::AgentError;
use crate::engine::planner::{Plan, Step};
use crate::tools::ToolResult;

/// 状态机驱动器的四个状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EngineState {
    Planning,
    Acting,
    Finalizing,
    Done,
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Done)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Planning => "Planning",
            EngineState::Acting => "Acting",
            EngineState::Finalizing => "Finalizing",
            EngineState::Done => "Done",
        };
        f.write_str(s)
    }
}

/// 单步执行结果：按步骤序号存储，同一工具出现多次时互不覆盖
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub index: usize,
    pub tool: String,
    pub result: ToolResult,
}

/// 按计划顺序排列的工具结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolResults {
    entries: Vec<StepResult>,
}

impl ToolResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepResult> {
        self.entries.iter().find(|e| e.index == index)
    }

    /// 某工具最近一次的结果
    pub fn latest(&self, tool: &str) -> Option<&ToolResult> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.tool == tool)
            .map(|e| &e.result)
    }

    pub fn push(&mut self, index: usize, tool: impl Into<String>, result: ToolResult) {
        self.entries.push(StepResult {
            index,
            tool: tool.into(),
            result,
        });
    }
}

/// 单次运行的可变上下文
#[derive(Debug)]
pub struct ExecutionState {
    task: String,
    plan: Plan,
    planned: bool,
    cursor: usize,
    tool_results: ToolResults,
    collector: Collector,
    final_answer: Option<String>,
}

impl ExecutionState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            plan: Plan::default(),
            planned: false,
            cursor: 0,
            tool_results: ToolResults::new(),
            collector: Collector::new(),
            final_answer: None,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn tool_results(&self) -> &ToolResults {
        &self.tool_results
    }

    pub fn trace(&self) -> &Trace {
        self.collector.trace()
    }

    pub fn metrics(&self) -> &Metrics {
        self.collector.metrics()
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    pub(crate) fn collector_mut(&mut self) -> &mut Collector {
        &mut self.collector
    }

    /// 写入计划；每次运行只能规划一次
    pub(crate) fn set_plan(&mut self, plan: Plan) -> Result<(), AgentError> {
        if self.planned {
            return Err(AgentError::contract("plan already set for this run"));
        }
        self.plan = plan;
        self.planned = true;
        Ok(())
    }

    /// 游标是否已到达计划末尾
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.plan.len()
    }

    /// 当前待执行的步骤；计划已走完时视为契约违例
    pub(crate) fn current_step(&self) -> Result<Step, AgentError> {
        if !self.planned {
            return Err(AgentError::contract("step requested before planning"));
        }
        self.plan.get(self.cursor).cloned().ok_or_else(|| {
            AgentError::contract(format!(
                "cursor {} exceeds plan length {}",
                self.cursor,
                self.plan.len()
            ))
        })
    }

    /// 提交当前步骤的结果并前移游标（结果写入与游标前移不可分割）
    pub(crate) fn commit_step(&mut self, step: &Step, result: ToolResult) -> Result<(), AgentError> {
        let expected = self.current_step()?;
        if &expected != step {
            return Err(AgentError::contract(format!(
                "committed step '{}' does not match step {} '{}'",
                step.tool(),
                self.cursor,
                expected.tool()
            )));
        }
        self.tool_results.push(self.cursor, step.tool(), result);
        self.cursor += 1;
        Ok(())
    }

    /// 写入最终答案：只能一次，且必须在计划走完之后
    pub(crate) fn set_final_answer(&mut self, answer: String) -> Result<(), AgentError> {
        if self.final_answer.is_some() {
            return Err(AgentError::contract("final answer already set"));
        }
        if !self.planned || !self.is_exhausted() {
            return Err(AgentError::contract(format!(
                "final answer set at cursor {} of {}",
                self.cursor,
                self.plan.len()
            )));
        }
        self.final_answer = Some(answer);
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Option<String>, ToolResults, Trace, Metrics) {
        let (trace, metrics) = self.collector.into_parts();
        (self.final_answer, self.tool_results, trace, metrics)
    }
}
