//! Integration module for connecting upstream segmentation stages with the
//! association engine.
//!
//! This module provides a source trait and helpers for feeding clustered
//! frames (from a dataset reader, a network, etc.) into a `SequenceTracker`.

mod builder;
mod pipeline;
mod source;

pub use builder::FrameBuilder;
pub use pipeline::{PipelineError, PipelineStep, SequencePipeline};
pub use source::{FrameIter, FrameSource};
