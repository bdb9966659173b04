//! 线性驱动器：规划一次，从前到后逐步执行，计划走完后进入合成

use std::time::Instant;

use crate::core::{AgentError, ExecutionState};
use crate::engine::Engine;

pub(crate) async fn drive(engine: &Engine, task: &str) -> Result<ExecutionState, AgentError> {
    let started = Instant::now();
    let mut state = ExecutionState::new(task);

    engine.plan_stage(&mut state)?;
    while !state.is_exhausted() {
        engine.act_stage(&mut state).await?;
    }
    engine.finalize_stage(&mut state, started).await?;

    Ok(state)
}

#[cfg(test)]
mod tests {
    use crate::engine::test_support::*;
    use crate::engine::Strategy;

    #[tokio::test]
    async fn test_steps_run_in_plan_order() {
        let engine = engine(
            vec!["web_scraper", "rag", "calculator"],
            vec![
                Scripted { name: "rag", fail: false },
                Scripted { name: "calculator", fail: false },
                Scripted { name: "web_scraper", fail: false },
            ],
            Strategy::Linear,
        );
        let state = engine.execute("t").await.unwrap();
        let order: Vec<&str> = state.tool_results().iter().map(|r| r.tool.as_str()).collect();
        assert_eq!(order, vec!["web_scraper", "rag", "calculator"]);
        assert_eq!(state.cursor(), 3);
        assert!(state.final_answer().is_some());
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_abort() {
        let engine = engine(
            vec!["missing", "rag"],
            vec![Scripted { name: "rag", fail: false }],
            Strategy::Linear,
        );
        let result = engine.run("t").await.unwrap();
        assert_eq!(
            result.steps,
            vec!["planner", "missing → ERROR: unknown tool 'missing'", "rag → OK", "final_llm"]
        );
    }

    #[tokio::test]
    async fn test_empty_plan_goes_straight_to_synthesis() {
        let engine = engine(vec![], vec![], Strategy::Linear);
        let result = engine.run("hello").await.unwrap();
        assert_eq!(result.steps, vec!["planner", "final_llm"]);
        assert!(result.metrics.tool_times.is_empty());
        assert!(!result.final_answer.is_empty());
    }
}
