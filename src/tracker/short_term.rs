//! Frame-to-frame association using only the previous id map.

use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::config::AssociationConfig;
use crate::error::Result;
use crate::tracker::assignment::{AssignmentResult, AssignmentSolver, LapjvSolver, linear_assignment};
use crate::tracker::centroid::class_clusters;
use crate::tracker::cost::distance_matrix;
use crate::tracker::frame::{ClassId, InstanceId, PointFrame};
use crate::tracker::instance::IdAllocator;
use crate::tracker::labels::FrameLabels;
use crate::tracker::output::AssociationOutput;

/// Matching decisions for one class, computed before any id is issued.
#[derive(Debug, Clone)]
struct ClassPlan {
    class_id: ClassId,
    clusters_t1: Vec<i32>,
    clusters_t2: Vec<i32>,
    assignment: AssignmentResult,
}

/// Associates clusters of frame t with clusters of frame t+1 by centroid
/// distance, without memory beyond the previous frame's ids.
pub struct ShortTermAssociator {
    config: AssociationConfig,
    solver: Box<dyn AssignmentSolver>,
}

impl ShortTermAssociator {
    pub fn new(config: AssociationConfig) -> Result<Self> {
        Self::with_solver(config, Box::new(LapjvSolver))
    }

    pub fn with_solver(config: AssociationConfig, solver: Box<dyn AssignmentSolver>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, solver })
    }

    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    /// Label both frames of a pair.
    ///
    /// `prev_ids` are the ids frame t received in the previous step; without
    /// them every frame-t cluster is minted fresh. `flow` (N×3 for frame t)
    /// advances frame-t centroids before matching. `ids` only advances if the
    /// step succeeds.
    pub fn associate(
        &self,
        t1: &PointFrame,
        t2: &PointFrame,
        prev_ids: Option<ArrayView1<'_, InstanceId>>,
        ids: &mut IdAllocator,
        flow: Option<ArrayView2<'_, f32>>,
    ) -> Result<AssociationOutput> {
        let plans = if self.config.association.parallel {
            self.config
                .fore_classes
                .par_iter()
                .map(|&class_id| self.plan_class(t1, t2, class_id, flow))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.config
                .fore_classes
                .iter()
                .map(|&class_id| self.plan_class(t1, t2, class_id, flow))
                .collect::<Result<Vec<_>>>()?
        };

        let mut local = *ids;
        let mut labels_t1 = FrameLabels::new(t1);
        let mut labels_t2 = FrameLabels::new(t2);

        for plan in plans.into_iter().flatten() {
            apply_plan(&plan, prev_ids, &mut local, &mut labels_t1, &mut labels_t2)?;
        }

        let minted = (local.max_id() - ids.max_id()) as usize;
        *ids = local;
        Ok(AssociationOutput {
            ids_t1: labels_t1.into_ids(),
            ids_t2: labels_t2.into_ids(),
            minted,
            unresolved: Vec::new(),
        })
    }

    fn plan_class(
        &self,
        t1: &PointFrame,
        t2: &PointFrame,
        class_id: ClassId,
        flow: Option<ArrayView2<'_, f32>>,
    ) -> Result<Option<ClassPlan>> {
        let clusters_t1 = class_clusters(t1, class_id, flow)?;
        let clusters_t2 = class_clusters(t2, class_id, None)?;

        if clusters_t1.is_empty() && clusters_t2.is_empty() {
            return Ok(None);
        }

        let assignment = if clusters_t1.is_empty() || clusters_t2.is_empty() {
            AssignmentResult::all_unmatched(clusters_t1.len(), clusters_t2.len())
        } else {
            let dists = distance_matrix(&clusters_t1.centers, &clusters_t2.centers);
            let max_dist = self.config.association.max_dist as f64;
            linear_assignment(self.solver.as_ref(), &dists, |d| d < max_dist)?
        };

        Ok(Some(ClassPlan {
            class_id,
            clusters_t1: clusters_t1.cluster_ids().to_vec(),
            clusters_t2: clusters_t2.cluster_ids().to_vec(),
            assignment,
        }))
    }
}

fn apply_plan(
    plan: &ClassPlan,
    prev_ids: Option<ArrayView1<'_, InstanceId>>,
    ids: &mut IdAllocator,
    labels_t1: &mut FrameLabels,
    labels_t2: &mut FrameLabels,
) -> Result<()> {
    let class_id = plan.class_id;

    for (row, col, accepted) in plan.assignment.solved_pairs() {
        let cluster_t1 = plan.clusters_t1[row];
        let cluster_t2 = plan.clusters_t2[col];
        let id_t1 = carried_id(labels_t1, prev_ids, class_id, cluster_t1, ids)?;
        labels_t1.assign(class_id, cluster_t1, id_t1)?;
        let id_t2 = if accepted { id_t1 } else { ids.mint() };
        labels_t2.assign(class_id, cluster_t2, id_t2)?;
    }

    for &row in &plan.assignment.unmatched_rows {
        let cluster_t1 = plan.clusters_t1[row];
        let id = carried_id(labels_t1, prev_ids, class_id, cluster_t1, ids)?;
        labels_t1.assign(class_id, cluster_t1, id)?;
    }

    for &col in &plan.assignment.unmatched_cols {
        let cluster_t2 = plan.clusters_t2[col];
        labels_t2.assign(class_id, cluster_t2, ids.mint())?;
    }

    log::trace!(
        "class {class_id}: {} matched, {} rejected, {} new in t+1",
        plan.assignment.matches.len(),
        plan.assignment.rejected.len(),
        plan.assignment.unmatched_cols.len()
    );
    Ok(())
}

/// Previous id of a frame-t cluster when one exists, otherwise a fresh one.
fn carried_id(
    labels: &FrameLabels,
    prev_ids: Option<ArrayView1<'_, InstanceId>>,
    class_id: ClassId,
    cluster_id: i32,
    ids: &mut IdAllocator,
) -> Result<InstanceId> {
    let previous = match prev_ids {
        Some(prev) => labels.previous_id(prev, class_id, cluster_id)?,
        None => None,
    };
    Ok(previous.unwrap_or_else(|| ids.mint()))
}
