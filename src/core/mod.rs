// Public modules
pub mod capability;
pub mod catalog;
pub mod command;
pub mod context;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod registry;
pub mod reporter;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use capability::{Capability, CapabilityDescriptor};
pub use catalog::PipelineCatalog;
pub use context::{ExecutionContext, StepContext};
pub use engine::{
    CancellationToken, ExecutionReport, ExecutorConfig, PipelineExecutor, RunStatus, StepOutcome,
    StepStatus,
};
pub use error::{Error, ErrorCode, Result};
pub use pipeline::{PipelineSpec, StepDefinition, StepSpec};
pub use probe::{EnvironmentProbe, FileProbe, NeverSkip};
pub use registry::CapabilityRegistry;
pub use reporter::{LogReporter, NoopReporter, ProgressReporter, RecordingReporter, StepEvent};
