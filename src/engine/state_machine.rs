//! 状态机驱动器
//!
//! 四个状态 Planning → Acting → Finalizing → Done，迁移由 (当前状态, 守卫) 查表决定：
//!
//! | from       | guard          | to         |
//! |------------|----------------|------------|
//! | Planning   | PlanEmpty      | Finalizing |
//! | Planning   | PlanReady      | Acting     |
//! | Acting     | StepsRemaining | Acting     |
//! | Acting     | PlanExhausted  | Finalizing |
//! | Finalizing | Always         | Done       |
//!
//! Acting 的自环每次恰好执行一步；Done 为终态，没有出边。每次迁移记录一条 Transition 事件。

use std::time::Instant;

use crate::core::{AgentError, EngineState, ExecutionState, TraceEvent};
use crate::engine::Engine;

/// 迁移守卫
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    PlanEmpty,
    PlanReady,
    StepsRemaining,
    PlanExhausted,
    Always,
}

const TRANSITIONS: &[(EngineState, Guard, EngineState)] = &[
    (EngineState::Planning, Guard::PlanEmpty, EngineState::Finalizing),
    (EngineState::Planning, Guard::PlanReady, EngineState::Acting),
    (EngineState::Acting, Guard::StepsRemaining, EngineState::Acting),
    (EngineState::Acting, Guard::PlanExhausted, EngineState::Finalizing),
    (EngineState::Finalizing, Guard::Always, EngineState::Done),
];

/// 查迁移表；不存在的迁移返回 None
pub fn transition(from: EngineState, guard: Guard) -> Option<EngineState> {
    TRANSITIONS
        .iter()
        .find(|(f, g, _)| *f == from && *g == guard)
        .map(|(_, _, to)| *to)
}

/// 一次状态机运行，可由调用方逐步推进
pub struct StateMachineRun<'e> {
    engine: &'e Engine,
    current: EngineState,
    execution: ExecutionState,
    started: Instant,
}

impl<'e> StateMachineRun<'e> {
    pub(crate) fn new(engine: &'e Engine, task: &str) -> Self {
        Self {
            engine,
            current: EngineState::Planning,
            execution: ExecutionState::new(task),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.current
    }

    pub fn execution(&self) -> &ExecutionState {
        &self.execution
    }

    /// 执行当前状态的动作并完成一次迁移，返回新状态
    pub async fn step(&mut self) -> Result<EngineState, AgentError> {
        let from = self.current;
        let guard = match from {
            EngineState::Planning => {
                self.engine.plan_stage(&mut self.execution)?;
                if self.execution.plan().is_empty() {
                    Guard::PlanEmpty
                } else {
                    Guard::PlanReady
                }
            }
            EngineState::Acting => {
                if self.execution.is_exhausted() {
                    Guard::PlanExhausted
                } else {
                    self.engine.act_stage(&mut self.execution).await?;
                    Guard::StepsRemaining
                }
            }
            EngineState::Finalizing => {
                self.engine
                    .finalize_stage(&mut self.execution, self.started)
                    .await?;
                Guard::Always
            }
            EngineState::Done => {
                return Err(AgentError::contract("step called on a finished run"));
            }
        };

        let to = transition(from, guard).ok_or_else(|| {
            AgentError::contract(format!("no transition from {from} under {guard:?}"))
        })?;
        tracing::debug!(from = %from, to = %to, "transition");
        self.execution
            .collector_mut()
            .record(TraceEvent::Transition { from, to });
        self.current = to;
        Ok(to)
    }

    /// 推进直到 Done
    pub async fn run_to_completion(mut self) -> Result<ExecutionState, AgentError> {
        while !self.current.is_terminal() {
            self.step().await?;
        }
        self.finish()
    }

    /// 结束运行并交出最终状态；只能在 Done 时调用
    pub fn finish(self) -> Result<ExecutionState, AgentError> {
        if !self.current.is_terminal() {
            return Err(AgentError::contract(format!(
                "finish called in state {}",
                self.current
            )));
        }
        Ok(self.execution)
    }
}
