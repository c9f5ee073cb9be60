//! Temporal instance association for 4D panoptic LiDAR segmentation.
//!
//! Clusters produced per frame by an upstream segmentation stage are linked
//! into instances that keep one global id across frames. Two associators are
//! provided: [`ShortTermAssociator`] matches consecutive frames only, and
//! [`LongTermAssociator`] matches against an [`ObjectCache`] so that an
//! instance survives a bounded number of missed frames.

pub mod config;
pub mod error;
pub mod integration;
pub mod tracker;

pub use config::{AssociationConfig, AssociationParams, DisappearancePolicy};
pub use error::{AssocError, Result};
pub use integration::{FrameBuilder, FrameIter, FrameSource, PipelineError, PipelineStep, SequencePipeline};
pub use tracker::{
    AssociationMode, AssociationOutput, BACKGROUND_ID, ClassId, IdAllocator, Instance, InstanceId,
    LongTermAssociator, ObjectCache, PointFrame, SceneFrame, SequenceTracker, ShortTermAssociator,
    UNCLUSTERED, UnresolvedDisappearance,
};
