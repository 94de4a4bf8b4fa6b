pub mod pipeline;
pub mod progress;

pub use pipeline::Orchestrator;
pub use progress::PipelineEvent;
