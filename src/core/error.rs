//! Agent 错误类型
//!
//! 工具失败、未知工具、合成失败都在各自边界被吸收为数据（ToolResult / Trace）；
//! 只有 ContractViolation（内部不变量被破坏）会从 Engine::run 向上传播。

use thiserror::Error;

/// 编排过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 计划中的工具名在注册表里不存在
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// 工具自身逻辑失败（含 panic）
    #[error("{0}")]
    ToolExecutionFailed(String),

    /// 语言模型后端失败或返回空内容
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    /// 内部不变量被破坏（游标越界、重复写入最终答案等），属于编程缺陷
    #[error("engine contract violation: {0}")]
    ContractViolation(String),

    #[error("config error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn contract(msg: impl Into<String>) -> Self {
        AgentError::ContractViolation(msg.into())
    }

    /// 是否为外部原因导致、应在本地恢复的错误
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AgentError::ContractViolation(_))
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::Config(e.to_string())
    }
}
