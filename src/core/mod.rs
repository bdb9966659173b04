//! 核心层：错误、运行状态、Trace 与 Metrics 收集器

pub mod error;
pub mod state;
pub mod trace;

pub use error::AgentError;
pub use state::{EngineState, ExecutionState, StepResult, ToolResults};
pub use trace::{Collector, Metrics, Trace, TraceEvent};
