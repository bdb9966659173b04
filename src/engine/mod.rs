//! 执行引擎
//!
//! Planner → 驱动器（反复调用 ToolDispatcher）→ Synthesizer → RunResult。
//! 提供两种行为等价的驱动器：线性迭代（loop_）与显式状态机（state_machine），
//! 二者共用下面的三个阶段函数，只在推进方式上不同。

pub mod loop_;
pub mod planner;
pub mod state_machine;
pub mod synthesis;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::core::{AgentError, ExecutionState, Metrics, TraceEvent};
use crate::tools::ToolDispatcher;

pub use planner::{KeywordPlanner, Plan, Planner, Step};
pub use state_machine::{transition, Guard, StateMachineRun};
pub use synthesis::{build_final_prompt, Synthesizer};

/// 驱动策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Linear,
    #[serde(alias = "state-machine", alias = "fsm")]
    StateMachine,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Linear => f.write_str("linear"),
            Strategy::StateMachine => f.write_str("state_machine"),
        }
    }
}

impl FromStr for Strategy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "linear" => Ok(Strategy::Linear),
            "state_machine" | "fsm" => Ok(Strategy::StateMachine),
            other => Err(AgentError::Config(format!("unknown engine strategy '{other}'"))),
        }
    }
}

/// run() 的返回值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub final_answer: String,
    pub steps: Vec<String>,
    pub metrics: Metrics,
}

impl RunResult {
    pub fn from_state(state: ExecutionState) -> Result<Self, AgentError> {
        let (final_answer, _, trace, metrics) = state.into_parts();
        let final_answer =
            final_answer.ok_or_else(|| AgentError::contract("run finished without a final answer"))?;
        Ok(Self {
            final_answer,
            steps: trace.to_strings(),
            metrics,
        })
    }
}

/// 执行引擎：显式注入 Planner、调度器与合成器
pub struct Engine {
    planner: Arc<dyn Planner>,
    dispatcher: ToolDispatcher,
    synthesizer: Synthesizer,
    strategy: Strategy,
}

impl Engine {
    pub fn new(planner: Arc<dyn Planner>, dispatcher: ToolDispatcher, synthesizer: Synthesizer) -> Self {
        Self {
            planner,
            dispatcher,
            synthesizer,
            strategy: Strategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// 执行任务并返回结果；工具与合成失败都体现在结果里，只有契约违例才返回 Err
    pub async fn run(&self, task: &str) -> Result<RunResult, AgentError> {
        RunResult::from_state(self.execute(task).await?)
    }

    /// 执行任务并返回最终的 ExecutionState（含逐步工具结果）
    pub async fn execute(&self, task: &str) -> Result<ExecutionState, AgentError> {
        let span = tracing::info_span!(
            "agent_run",
            run_id = %Uuid::new_v4(),
            strategy = %self.strategy
        );
        async {
            tracing::info!(task_len = task.len(), "run started");
            let state = match self.strategy {
                Strategy::Linear => loop_::drive(self, task).await?,
                Strategy::StateMachine => self.start(task).run_to_completion().await?,
            };
            tracing::info!(
                steps = state.tool_results().len(),
                total_run_time = state.metrics().total_run_time,
                "run finished"
            );
            Ok::<_, AgentError>(state)
        }
        .instrument(span)
        .await
    }

    /// 以状态机方式开始一次运行，由调用方逐步推进
    pub fn start(&self, task: &str) -> StateMachineRun<'_> {
        StateMachineRun::new(self, task)
    }

    pub(crate) fn plan_stage(&self, state: &mut ExecutionState) -> Result<(), AgentError> {
        let plan = self.planner.plan(state.task());
        tracing::info!(tools = ?plan.tools(), "planned");
        state.set_plan(plan)?;
        state.collector_mut().record(TraceEvent::Planner);
        Ok(())
    }

    /// 执行游标处的一步；结果写入与游标前移在下一步开始前完成
    pub(crate) async fn act_stage(&self, state: &mut ExecutionState) -> Result<(), AgentError> {
        let step = state.current_step()?;
        let result = self
            .dispatcher
            .invoke(step.tool(), step.input(), state.collector_mut())
            .await;
        state.commit_step(&step, result)
    }

    pub(crate) async fn finalize_stage(
        &self,
        state: &mut ExecutionState,
        started: Instant,
    ) -> Result<(), AgentError> {
        let (answer, cost) = self
            .synthesizer
            .synthesize(state.task(), state.tool_results())
            .await;
        state.set_final_answer(answer)?;
        let collector = state.collector_mut();
        collector.record(TraceEvent::FinalLlm);
        collector.set_llm_cost(cost);
        collector.stamp_total_run_time(started.elapsed());
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("linear".parse::<Strategy>().unwrap(), Strategy::Linear);
        assert_eq!("state-machine".parse::<Strategy>().unwrap(), Strategy::StateMachine);
        assert_eq!("State_Machine".parse::<Strategy>().unwrap(), Strategy::StateMachine);
        assert!("parallel".parse::<Strategy>().is_err());
        assert_eq!(Strategy::StateMachine.to_string(), "state_machine");
    }

    #[tokio::test]
    async fn test_run_result_projection() {
        let engine = engine(
            vec!["rag", "calculator"],
            vec![
                Scripted { name: "rag", fail: false },
                Scripted { name: "calculator", fail: true },
            ],
            Strategy::Linear,
        );
        let result = engine.run("what is 2+2").await.unwrap();
        assert_eq!(result.final_answer, "Mock answer for: what is 2+2");
        assert_eq!(
            result.steps,
            vec![
                "planner",
                "rag → OK",
                "calculator → ERROR: calculator failed",
                "final_llm"
            ]
        );
        assert!(result.metrics.tool_times.contains_key("rag"));
        assert!(result.metrics.tool_times.contains_key("calculator"));
        assert!(result.metrics.total_run_time >= 0.0);
        assert_eq!(result.metrics.llm_cost.model, "mock");

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["metrics"]["tool_times"].is_object());
        assert!(json["metrics"]["llm_cost"]["estimated_cost_usd"].is_number());
    }

    #[tokio::test]
    async fn test_execute_keeps_duplicate_tool_results() {
        let engine = engine(
            vec!["calculator", "calculator"],
            vec![Scripted { name: "calculator", fail: false }],
            Strategy::StateMachine,
        );
        let state = engine.execute("1+1").await.unwrap();
        assert_eq!(state.tool_results().len(), 2);
        assert_eq!(state.tool_results().get(1).map(|r| r.index), Some(1));
        assert_eq!(state.metrics().tool_times.len(), 1);
    }
}
