//! Pipeline execution: variant builds, publish stage, and the engine

pub mod builder;
pub mod engine;
pub mod publisher;

pub use builder::{BuildOutcome, BuildSettings, BuildStep, StepFailure, VariantBuilder};
pub use engine::{EventHandler, PipelineEngine, PipelineEvent, SchedulingStrategy};
pub use publisher::{PublishFailure, PublishStep, Publisher};
