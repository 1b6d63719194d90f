pub mod publisher;
pub mod types;

// Re-export key types for convenience
pub use publisher::{
    CompositeProgressSink, EventPublisher, ProgressSink, PublishError, TracingProgressSink,
};
pub use types::{constants, ProgressEvent, RunTransition, StepTransition};
