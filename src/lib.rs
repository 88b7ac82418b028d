//! echoline library exports for testing

pub mod core;
pub mod pipeline;
pub mod terminal;

#[cfg(test)]
pub mod test_support;

pub use crate::core::frame::{Frame, OverflowPolicy};
pub use pipeline::output::Display;
pub use pipeline::{PipelineError, PipelineHandle, PipelineSettings, Shutdown, StopReason};
