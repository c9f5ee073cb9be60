//! Results of one association step.

use ndarray::Array1;

use crate::config::DisappearancePolicy;
use crate::tracker::frame::{ClassId, InstanceId};

/// Ids for both frames of a pair, one per input point.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationOutput {
    pub ids_t1: Array1<InstanceId>,
    pub ids_t2: Array1<InstanceId>,
    /// Number of ids issued during the step.
    pub minted: usize,
    /// Frame-t clusters that could not be tied to a cache instance.
    pub unresolved: Vec<UnresolvedDisappearance>,
}

/// A frame-t cluster whose track vanished from frame t+1 and whose nearest
/// cache instance is farther away than its flow explains.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedDisappearance {
    pub class_id: ClassId,
    pub cluster_id: i32,
    /// Points in the frame-t cluster.
    pub point_count: usize,
    /// Nearest live instance, if the class had any.
    pub candidate: Option<InstanceId>,
    /// Distance between the flow-adjusted centroid and the candidate's center.
    pub observed_displacement: f32,
    /// Mean flow magnitude of the cluster plus tolerance.
    pub expected_displacement: f32,
    /// Id the cluster was labelled with instead.
    pub fallback_id: InstanceId,
    pub policy: DisappearancePolicy,
}
