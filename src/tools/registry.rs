//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolRegistry 按名注册与查找，
//! ToolDispatcher 在调用时计时、兜住失败并统一转为 ToolResult。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 工具成功时的输出：纯文本或结构化记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Record(Value),
}

impl ToolOutput {
    /// 转为可拼进 prompt 的文本（记录序列化为紧凑 JSON）
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Text(s) => s.clone(),
            ToolOutput::Record(v) => v.to_string(),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        ToolOutput::Text(s)
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        ToolOutput::Text(s.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(v: Value) -> Self {
        ToolOutput::Record(v)
    }
}

/// 一次工具调用的结果：成功负载或错误信息，二者恰有其一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { output: ToolOutput },
    Error { message: String },
}

impl ToolResult {
    pub fn success(output: impl Into<ToolOutput>) -> Self {
        ToolResult::Success {
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolResult::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ToolResult::Error { message } => Some(message),
            ToolResult::Success { .. } => None,
        }
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolResult::Success { output } => f.write_str(&output.render()),
            ToolResult::Error { message } => write!(f, "ERROR: {message}"),
        }
    }
}

/// 工具 trait：名称、描述、异步执行（输入为整条字符串）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（计划步骤里的 tool 字段）
    fn name(&self) -> &str;

    /// 工具描述
    fn description(&self) -> &str;

    /// 执行工具；失败返回可读的错误字符串
    async fn execute(&self, input: &str) -> Result<ToolOutput, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    /// 注册已共享的工具实例（同名覆盖）
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "tool re-registered, previous implementation replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 返回 (name, description) 列表
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.description().to_string()))
            .collect();
        out.sort();
        out
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase the input"
        }

        async fn execute(&self, input: &str) -> Result<ToolOutput, String> {
            Ok(input.to_uppercase().into())
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Upper);
        assert!(registry.contains("upper"));
        assert!(registry.get("lower").is_none());

        let tool = registry.get("upper").unwrap();
        assert_eq!(tool.execute("abc").await, Ok(ToolOutput::from("ABC")));
        assert_eq!(
            registry.tool_descriptions(),
            vec![("upper".to_string(), "Uppercase the input".to_string())]
        );
    }

    #[test]
    fn test_output_render() {
        assert_eq!(ToolOutput::from("plain").render(), "plain");
        let record = ToolOutput::from(serde_json::json!({"response": "42"}));
        assert_eq!(record.render(), r#"{"response":"42"}"#);
    }

    #[test]
    fn test_result_display() {
        assert_eq!(ToolResult::success("ok").to_string(), "ok");
        assert_eq!(ToolResult::error("bad").to_string(), "ERROR: bad");
        assert_eq!(ToolResult::error("bad").error_message(), Some("bad"));
        assert!(ToolResult::success("ok").is_success());
    }
}
