pub mod orchestrator;
pub mod step_executor;
pub mod task_analyzer;
pub mod task_types;

pub use orchestrator::*;
pub use task_types::*;
