//! 引擎集成测试：两种驱动器等价、全部工具失败时仍有答案、计算工具的错误收敛、规划顺序、分块性质

use std::sync::Arc;

use agentforge::core::TraceEvent;
use agentforge::engine::{Engine, KeywordPlanner, Plan, Planner, Step, Strategy, Synthesizer};
use agentforge::llm::{Completion, LlmClient, LlmError, MockLlmClient};
use agentforge::retrieval::chunk_words;
use agentforge::tools::{CalculatorTool, Tool, ToolDispatcher, ToolOutput, ToolRegistry};
use async_trait::async_trait;

#[derive(Clone, Copy)]
enum Behavior {
    Ok,
    Fail,
    Panic,
}

struct ScriptedTool {
    name: &'static str,
    behavior: Behavior,
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "scripted test tool"
    }

    async fn execute(&self, input: &str) -> Result<ToolOutput, String> {
        match self.behavior {
            Behavior::Ok => Ok(ToolOutput::Text(format!("{} saw {}", self.name, input))),
            Behavior::Fail => Err(format!("{} is down", self.name)),
            Behavior::Panic => panic!("{} exploded", self.name),
        }
    }
}

struct FixedPlan(Vec<&'static str>);

impl Planner for FixedPlan {
    fn plan(&self, task: &str) -> Plan {
        Plan::from_steps(self.0.iter().map(|t| Step::new(*t, task)).collect())
    }
}

struct DownLlm;

#[async_trait]
impl LlmClient for DownLlm {
    fn model(&self) -> &str {
        "llama3.1"
    }

    async fn complete(&self, _prompt: &str) -> Result<Completion, LlmError> {
        Err(LlmError::Http("connection refused".to_string()))
    }
}

fn registry(tools: &[(&'static str, Behavior)]) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for &(name, behavior) in tools {
        registry.register(ScriptedTool { name, behavior });
    }
    registry
}

fn engine(
    planner: Arc<dyn Planner>,
    tools: &[(&'static str, Behavior)],
    llm: Arc<dyn LlmClient>,
    strategy: Strategy,
) -> Engine {
    Engine::new(planner, ToolDispatcher::new(registry(tools)), Synthesizer::new(llm)).with_strategy(strategy)
}

#[tokio::test]
async fn linear_and_state_machine_drivers_are_equivalent() {
    let cases: Vec<(Vec<&'static str>, Vec<(&'static str, Behavior)>)> = vec![
        (vec![], vec![]),
        (vec!["rag"], vec![("rag", Behavior::Ok)]),
        (
            vec!["rag", "calculator", "web_scraper"],
            vec![
                ("rag", Behavior::Ok),
                ("calculator", Behavior::Fail),
                ("web_scraper", Behavior::Panic),
            ],
        ),
        (vec!["ghost", "rag"], vec![("rag", Behavior::Fail)]),
        (
            vec!["calculator", "calculator"],
            vec![("calculator", Behavior::Ok)],
        ),
    ];

    for (plan, tools) in cases {
        let planner: Arc<dyn Planner> = Arc::new(FixedPlan(plan.clone()));
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new());
        let linear = engine(planner.clone(), &tools, llm.clone(), Strategy::Linear)
            .execute("compare drivers")
            .await
            .unwrap();
        let fsm = engine(planner, &tools, llm, Strategy::StateMachine)
            .execute("compare drivers")
            .await
            .unwrap();

        assert_eq!(linear.tool_results(), fsm.tool_results(), "plan {plan:?}");
        assert_eq!(linear.final_answer(), fsm.final_answer(), "plan {plan:?}");
        assert_eq!(linear.trace().lifecycle(), fsm.trace().lifecycle(), "plan {plan:?}");
        assert!(linear.trace().events().iter().all(|e| !e.is_transition()));
        assert!(fsm.trace().events().iter().any(|e| e.is_transition()));

        let linear_tools: Vec<_> = linear.metrics().tool_times.keys().collect();
        let fsm_tools: Vec<_> = fsm.metrics().tool_times.keys().collect();
        assert_eq!(linear_tools, fsm_tools);
    }
}

#[tokio::test]
async fn total_failure_still_yields_an_answer() {
    for strategy in [Strategy::Linear, Strategy::StateMachine] {
        let engine = engine(
            Arc::new(KeywordPlanner::default()),
            &[
                ("rag", Behavior::Fail),
                ("calculator", Behavior::Panic),
                ("web_scraper", Behavior::Fail),
            ],
            Arc::new(DownLlm),
            strategy,
        );

        let task = "explain 2 + 2 from the website https://example.com/math";
        let result = engine.run(task).await.unwrap();

        assert!(!result.final_answer.is_empty());
        assert!(result.metrics.llm_cost.estimated_cost_usd == 0.0);
        for tool in ["rag", "calculator", "web_scraper"] {
            let t = result.metrics.tool_times.get(tool).copied();
            assert!(t.is_some_and(|t| t >= 0.0), "{tool} missing from tool_times");
        }
        assert!(result.steps.contains(&"calculator → ERROR: tool panicked: calculator exploded".to_string()));
        assert!(result.steps.contains(&"rag → ERROR: rag is down".to_string()));
        assert_eq!(result.steps.last().map(String::as_str), Some("final_llm"));
    }
}

#[tokio::test]
async fn trace_records_each_stage_in_order() {
    let engine = engine(
        Arc::new(KeywordPlanner::default()),
        &[("rag", Behavior::Ok), ("calculator", Behavior::Ok)],
        Arc::new(MockLlmClient::new()),
        Strategy::StateMachine,
    );
    let state = engine
        .execute("Calculate 15 percent of 200 and explain the result")
        .await
        .unwrap();
    assert_eq!(
        state.trace().lifecycle(),
        vec![
            TraceEvent::Planner,
            TraceEvent::ToolOk { tool: "rag".into() },
            TraceEvent::ToolOk { tool: "calculator".into() },
            TraceEvent::FinalLlm,
        ]
    );
}

fn calculator_engine(strategy: Strategy) -> Engine {
    let mut registry = ToolRegistry::new();
    registry.register(CalculatorTool::default());
    Engine::new(
        Arc::new(KeywordPlanner::default()),
        ToolDispatcher::new(registry),
        Synthesizer::new(Arc::new(DownLlm)),
    )
    .with_strategy(strategy)
}

#[tokio::test]
async fn deeply_nested_arithmetic_fails_as_a_tool_error() {
    let n = 100_000;
    let task = format!("calculate {}1{}", "(".repeat(n), ")".repeat(n));
    for strategy in [Strategy::Linear, Strategy::StateMachine] {
        let result = calculator_engine(strategy).run(&task).await.unwrap();
        assert_eq!(
            result.steps,
            vec![
                "planner",
                "calculator → ERROR: CALC_ERROR: expression nested too deeply",
                "final_llm",
            ]
        );
        assert!(!result.final_answer.is_empty());
    }
}

#[tokio::test]
async fn verb_phrased_arithmetic_is_evaluated() {
    let state = calculator_engine(Strategy::Linear)
        .execute("multiply 6 by 7 according to the docs")
        .await
        .unwrap();
    let calc = state.tool_results().latest("calculator").unwrap();
    assert!(calc.is_success(), "{calc}");
    assert!(calc.to_string().contains("\"response\":\"42\""));
}

#[test]
fn planner_keeps_category_order() {
    let planner = KeywordPlanner::default();
    let tasks = [
        "visit the url then explain the document and calculate 3 * 4",
        "multiply 6 by 7 according to the docs",
        "scrape the web",
        "hello",
        "12",
    ];
    let rank = |tool: &str| match tool {
        "rag" => 0,
        "calculator" => 1,
        "web_scraper" => 2,
        other => panic!("unexpected tool {other}"),
    };
    for task in tasks {
        let plan = planner.plan(task);
        assert!(!plan.is_empty());
        let ranks: Vec<i32> = plan.iter().map(|s| rank(s.tool())).collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]), "{task}: {ranks:?}");
        assert!(plan.iter().all(|s| s.input() == task));
    }
}

#[test]
fn chunking_300_words_round_trips() {
    let words: Vec<String> = (0..300).map(|i| format!("w{i}")).collect();
    let text = words.join(" ");

    let chunks = chunk_words(&text, 250, 40);
    assert_eq!(chunks.len(), 2);

    let first: Vec<&str> = chunks[0].split_whitespace().collect();
    let second: Vec<&str> = chunks[1].split_whitespace().collect();
    assert_eq!(first, words[0..250].iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(second, words[210..300].iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(&first[210..], &second[..40]);

    let mut rebuilt = first.clone();
    rebuilt.extend_from_slice(&second[40..]);
    assert_eq!(rebuilt.join(" "), text);
}
