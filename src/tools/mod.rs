pub mod calculator;
pub mod executor;
pub mod registry;
pub mod retrieval;
pub mod web_fetch;

pub use calculator::CalculatorTool;
pub use executor::ToolDispatcher;
pub use registry::{Tool, ToolOutput, ToolRegistry, ToolResult};
pub use retrieval::RetrievalTool;
pub use web_fetch::WebFetchTool;
