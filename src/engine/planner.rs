//! Planner：任务 → 有序工具步骤
//!
//! 基于关键词的规则规划器：按「检索 → 计算 → 网页抓取」的固定顺序判断三类意图，
//! 每类至多一步，输入都是完整任务文本；一类都未命中时退回单个检索步骤。
//! 纯函数，无副作用，不会失败。

use serde::Serialize;

use crate::config::PlannerConfig;

pub const DEFAULT_RETRIEVAL_KEYWORDS: &[&str] = &[
    "document",
    "docs",
    "according to",
    "context",
    "from file",
    "from ingestion",
    "knowledge base",
    "database",
    "rag",
    "what",
    "explain",
];

pub const DEFAULT_COMPUTATION_KEYWORDS: &[&str] = &[
    "calculate",
    "sum",
    "minus",
    "percentage",
    "percent",
    "divide",
    "multiply",
];

pub const DEFAULT_WEB_KEYWORDS: &[&str] = &[
    "website", "web", "internet", "url", "link", "fetch", "scrape", "visit",
];

/// 计划中的一步：工具名 + 输入。只由 Planner 创建，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    tool: String,
    input: String,
}

impl Step {
    pub fn new(tool: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            input: input.into(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

/// 有序步骤序列，可以为空
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    /// 步骤对应的工具名（按顺序）
    pub fn tools(&self) -> Vec<&str> {
        self.steps.iter().map(Step::tool).collect()
    }
}

/// 规划器接口；Engine 只依赖它，测试可注入固定计划
pub trait Planner: Send + Sync {
    fn plan(&self, task: &str) -> Plan;
}

/// 一类意图：命中关键词（大小写不敏感的子串匹配）即产生一个步骤
#[derive(Debug, Clone)]
struct Category {
    tool: String,
    keywords: Vec<String>,
    match_digits: bool,
}

impl Category {
    fn new(tool: &str, keywords: &[String], match_digits: bool) -> Self {
        Self {
            tool: tool.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            match_digits,
        }
    }

    fn triggers(&self, lowered: &str) -> bool {
        (self.match_digits && lowered.chars().any(|c| c.is_ascii_digit()))
            || self.keywords.iter().any(|k| !k.is_empty() && lowered.contains(k.as_str()))
    }
}

/// 关键词规划器
#[derive(Debug, Clone)]
pub struct KeywordPlanner {
    retrieval: Category,
    computation: Category,
    web: Category,
}

impl KeywordPlanner {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            retrieval: Category::new(&config.retrieval_tool, &config.retrieval_keywords, false),
            computation: Category::new(&config.computation_tool, &config.computation_keywords, true),
            web: Category::new(&config.web_tool, &config.web_keywords, false),
        }
    }

    /// 默认（检索）工具名
    pub fn default_tool(&self) -> &str {
        &self.retrieval.tool
    }
}

impl Default for KeywordPlanner {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

impl Planner for KeywordPlanner {
    fn plan(&self, task: &str) -> Plan {
        let lowered = task.to_lowercase();
        let mut steps: Vec<Step> = [&self.retrieval, &self.computation, &self.web]
            .into_iter()
            .filter(|c| c.triggers(&lowered))
            .map(|c| Step::new(c.tool.clone(), task))
            .collect();

        if steps.is_empty() {
            steps.push(Step::new(self.retrieval.tool.clone(), task));
        }

        tracing::debug!(tools = ?steps.iter().map(Step::tool).collect::<Vec<_>>(), "plan");
        Plan::from_steps(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(task: &str) -> Vec<String> {
        KeywordPlanner::default()
            .plan(task)
            .iter()
            .map(|s| s.tool().to_string())
            .collect()
    }

    #[test]
    fn test_no_keyword_defaults_to_retrieval() {
        let plan = KeywordPlanner::default().plan("hello");
        assert_eq!(plan.steps(), &[Step::new("rag", "hello")]);
    }

    #[test]
    fn test_percent_example() {
        let task = "Calculate 15 percent of 200 and explain the result";
        let plan = KeywordPlanner::default().plan(task);
        assert_eq!(
            plan.steps(),
            &[Step::new("rag", task), Step::new("calculator", task)]
        );
    }

    #[test]
    fn test_fixed_category_order() {
        // 关键词在文本中的出现顺序与计划顺序无关
        assert_eq!(
            tools("scrape https://example.com, sum 2 and 3, then explain"),
            vec!["rag", "calculator", "web_scraper"]
        );
        assert_eq!(tools("visit the website and multiply"), vec!["calculator", "web_scraper"]);
        assert_eq!(tools("Fetch this LINK"), vec!["web_scraper"]);
    }

    #[test]
    fn test_digit_triggers_computation() {
        assert_eq!(tools("42"), vec!["calculator"]);
    }

    #[test]
    fn test_inputs_are_full_task() {
        let task = "What does the document say about 3 cats on the web?";
        let plan = KeywordPlanner::default().plan(task);
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|s| s.input() == task));
    }

    #[test]
    fn test_custom_tool_names() {
        let config = PlannerConfig {
            retrieval_tool: "docs".into(),
            ..PlannerConfig::default()
        };
        let planner = KeywordPlanner::from_config(&config);
        assert_eq!(planner.default_tool(), "docs");
        assert_eq!(planner.plan("hello").tools(), vec!["docs"]);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let planner = KeywordPlanner::default();
        let task = "explain 2 + 2 from the docs";
        assert_eq!(planner.plan(task), planner.plan(task));
    }
}
