//! SequencePipeline for driving a tracker from a frame source.

use thiserror::Error;

use crate::config::AssociationConfig;
use crate::error::{AssocError, Result};
use crate::tracker::{AssociationMode, AssociationOutput, SequenceTracker};

use super::FrameSource;

/// Failure of one pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError<E> {
    #[error("frame source failed: {0}")]
    Source(E),

    #[error(transparent)]
    Association(#[from] AssocError),
}

/// Result of feeding one frame through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStep {
    pub scene: String,
    /// Position of the frame within its scene, starting at 1.
    pub frame_id: u32,
    /// `None` for the first frame of a scene.
    pub output: Option<AssociationOutput>,
}

/// Bundles any `FrameSource` with a [`SequenceTracker`].
pub struct SequencePipeline<S: FrameSource> {
    source: S,
    tracker: SequenceTracker,
}

impl<S: FrameSource> SequencePipeline<S> {
    /// Create a pipeline with the given source, configuration and mode.
    pub fn new(source: S, config: AssociationConfig, mode: AssociationMode) -> Result<Self> {
        Ok(Self::with_tracker(source, SequenceTracker::new(config, mode)?))
    }

    pub fn with_tracker(source: S, tracker: SequenceTracker) -> Self {
        Self { source, tracker }
    }

    /// Pull one frame from the source and associate it.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    pub fn process_next(&mut self) -> std::result::Result<Option<PipelineStep>, PipelineError<S::Error>> {
        let Some(input) = self.source.next_frame().map_err(PipelineError::Source)? else {
            return Ok(None);
        };
        let scene = input.scene.clone();
        let output = self.tracker.update(input)?;
        Ok(Some(PipelineStep {
            scene,
            frame_id: self.tracker.frame_id(),
            output,
        }))
    }

    /// Drain the source, handing every step to `on_step`.
    ///
    /// Returns the number of frames processed.
    pub fn run<F>(&mut self, mut on_step: F) -> std::result::Result<usize, PipelineError<S::Error>>
    where
        F: FnMut(PipelineStep),
    {
        let mut frames = 0;
        while let Some(step) = self.process_next()? {
            on_step(step);
            frames += 1;
        }
        log::debug!("Pipeline drained after {frames} frames");
        Ok(frames)
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the underlying source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut SequenceTracker {
        &mut self.tracker
    }
}
