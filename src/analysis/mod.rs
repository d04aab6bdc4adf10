//! Analysis and result aggregation modules
//!
//! Combines all feature extraction results into the final artifact:
//! - Result types
//! - Progress notifications
//! - Assembly and validation

pub mod assembler;
pub mod progress;
pub mod result;

pub use assembler::{assemble, validate, StageOutputs};
pub use progress::{LogProgress, NullProgress, PipelineStage, ProgressEvent, ProgressSink};
