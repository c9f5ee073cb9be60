//! Association against the object cache, with re-identification across
//! missed detections.

use nalgebra::Vector3;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::config::{AssociationConfig, DisappearancePolicy};
use crate::error::{AssocError, Result};
use crate::tracker::assignment::{AssignmentResult, AssignmentSolver, LapjvSolver, linear_assignment};
use crate::tracker::cache::ObjectCache;
use crate::tracker::centroid::{ClassClusters, class_clusters, extract_centroids};
use crate::tracker::cost::{CostGates, association_cost, distance_matrix, is_feasible};
use crate::tracker::frame::{ClassId, InstanceId, PointFrame};
use crate::tracker::instance::Instance;
use crate::tracker::labels::FrameLabels;
use crate::tracker::output::{AssociationOutput, UnresolvedDisappearance};

/// Slack added to a cluster's flow magnitude when tying it to a cache instance.
pub const DISPLACEMENT_TOLERANCE: f32 = 1e-4;

/// Left-hand side of the cost matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Row {
    /// Frame-t cluster seeded into an empty class partition.
    Seeded(usize),
    /// Live cache instance.
    Cached(InstanceId),
}

/// Why a frame-t cluster could not be tied to a cache instance.
#[derive(Debug, Clone, Copy)]
struct Miss {
    candidate: Option<InstanceId>,
    observed: f32,
    expected: f32,
}

/// A cluster set with its mean features.
#[derive(Debug, Clone)]
struct Side {
    clusters: ClassClusters,
    features: Array2<f32>,
}

/// Matching decisions for one class, computed from the decayed cache before
/// any id is issued.
#[derive(Debug, Clone)]
struct ClassPlan {
    class_id: ClassId,
    t1: Side,
    t2: Side,
    rows: Vec<Row>,
    /// Per frame-t cluster: the cache instance it continues, or why not.
    resolution: Vec<std::result::Result<InstanceId, Miss>>,
    assignment: AssignmentResult,
}

/// Associates frame t+1 clusters with the live tracks of an [`ObjectCache`].
pub struct LongTermAssociator {
    config: AssociationConfig,
    solver: Box<dyn AssignmentSolver>,
}

impl LongTermAssociator {
    pub fn new(config: AssociationConfig) -> Result<Self> {
        Self::with_solver(config, Box::new(LapjvSolver))
    }

    pub fn with_solver(config: AssociationConfig, solver: Box<dyn AssignmentSolver>) -> Result<Self> {
        config.validate()?;
        if config.association.life < 1 {
            return Err(AssocError::Configuration(format!(
                "long-term association needs association.life >= 1, got {}",
                config.association.life
            )));
        }
        Ok(Self { config, solver })
    }

    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    /// Empty cache sized to this associator's life budget.
    pub fn new_cache(&self) -> ObjectCache {
        ObjectCache::new(self.config.association.life)
    }

    /// Advance `cache` by one frame pair and label both frames.
    ///
    /// Ages the cache once, then matches every foreground class. On error the
    /// cache is left exactly as it was passed in.
    pub fn associate(
        &self,
        t1: &PointFrame,
        t2: &PointFrame,
        cache: &mut ObjectCache,
        flow: Option<ArrayView2<'_, f32>>,
    ) -> Result<AssociationOutput> {
        if cache.max_life() != self.config.association.life {
            return Err(AssocError::Configuration(format!(
                "cache life budget {} differs from association.life {}",
                cache.max_life(),
                self.config.association.life
            )));
        }

        let mut working = cache.clone();
        working.update_step();

        let plans = if self.config.association.parallel {
            self.config
                .fore_classes
                .par_iter()
                .map(|&class_id| self.plan_class(t1, t2, class_id, &working, flow))
                .collect::<Result<Vec<_>>>()?
        } else {
            self.config
                .fore_classes
                .iter()
                .map(|&class_id| self.plan_class(t1, t2, class_id, &working, flow))
                .collect::<Result<Vec<_>>>()?
        };

        let mut labels_t1 = FrameLabels::new(t1);
        let mut labels_t2 = FrameLabels::new(t2);
        let mut unresolved = Vec::new();
        for plan in plans.into_iter().flatten() {
            self.apply_plan(
                &plan,
                &mut working,
                &mut labels_t1,
                &mut labels_t2,
                &mut unresolved,
            )?;
        }

        let minted = (working.max_id() - cache.max_id()) as usize;
        log::debug!(
            "Long-term step: {} live instances, {} new ids, {} unresolved",
            working.len(),
            minted,
            unresolved.len()
        );
        *cache = working;

        Ok(AssociationOutput {
            ids_t1: labels_t1.into_ids(),
            ids_t2: labels_t2.into_ids(),
            minted,
            unresolved,
        })
    }

    fn plan_class(
        &self,
        t1: &PointFrame,
        t2: &PointFrame,
        class_id: ClassId,
        cache: &ObjectCache,
        flow: Option<ArrayView2<'_, f32>>,
    ) -> Result<Option<ClassPlan>> {
        let t1 = side(t1, class_id, flow)?;
        let t2 = side(t2, class_id, None)?;
        if t1.clusters.is_empty() && t2.clusters.is_empty() {
            return Ok(None);
        }

        let instances: Vec<&Instance> = cache.instances(class_id).collect();

        let (rows, resolution, left_centers, left_features) = if instances.is_empty() {
            let rows: Vec<Row> = (0..t1.clusters.len()).map(Row::Seeded).collect();
            (rows, Vec::new(), t1.clusters.centers.clone(), t1.features.clone())
        } else {
            let resolution = self.resolve(&t1.clusters, &instances, cache.max_life())?;
            let rows: Vec<Row> = instances.iter().map(|inst| Row::Cached(inst.id)).collect();
            let centers: Vec<Vector3<f32>> = instances.iter().map(|inst| inst.center).collect();
            // Nothing to cost against, or a scan without a feature block.
            let features = if t2.clusters.is_empty() || t2.features.ncols() == 0 {
                Array2::zeros((instances.len(), 0))
            } else {
                stack_features(class_id, &instances, t2.features.ncols())?
            };
            (rows, resolution, centers, features)
        };

        let assignment = if left_centers.is_empty() || t2.clusters.is_empty() {
            AssignmentResult::all_unmatched(left_centers.len(), t2.clusters.len())
        } else {
            let features = (left_features.ncols() > 0 && t2.features.ncols() > 0)
                .then(|| (left_features.view(), t2.features.view()));
            let gates = CostGates {
                max_dist: self.config.association.max_dist,
                max_feat: self.config.association.max_feat,
            };
            let cost = association_cost(&left_centers, &t2.clusters.centers, features, gates)?;
            linear_assignment(self.solver.as_ref(), &cost, is_feasible)?
        };

        Ok(Some(ClassPlan {
            class_id,
            t1,
            t2,
            rows,
            resolution,
            assignment,
        }))
    }

    /// Tie each frame-t cluster to the cache instance it continues.
    ///
    /// One-to-one on displacement; an instance qualifies only if it was
    /// observed in frame t and sits within the cluster's flow magnitude.
    fn resolve(
        &self,
        t1: &ClassClusters,
        instances: &[&Instance],
        max_life: i32,
    ) -> Result<Vec<std::result::Result<InstanceId, Miss>>> {
        if t1.is_empty() {
            return Ok(Vec::new());
        }
        let cached: Vec<Vector3<f32>> = instances.iter().map(|inst| inst.center).collect();
        let disp = distance_matrix(&t1.centers, &cached);
        let pairs = self.solver.solve(disp.view())?;

        let mut resolution: Vec<std::result::Result<InstanceId, Miss>> = (0..t1.len())
            .map(|i| {
                Err(Miss {
                    candidate: None,
                    observed: f32::INFINITY,
                    expected: t1.flow_norms[i] + DISPLACEMENT_TOLERANCE,
                })
            })
            .collect();
        let mut taken = vec![false; instances.len()];

        for (row, col) in pairs {
            let expected = t1.flow_norms[row] + DISPLACEMENT_TOLERANCE;
            let observed = disp[[row, col]] as f32;
            if observed <= expected && instances[col].life == max_life - 1 {
                resolution[row] = Ok(instances[col].id);
                taken[col] = true;
            }
        }

        // Nearest instance not claimed by another cluster, for diagnostics.
        for (row, res) in resolution.iter_mut().enumerate() {
            if let Err(miss) = res {
                let nearest = (0..instances.len())
                    .filter(|&col| !taken[col])
                    .min_by(|&a, &b| disp[[row, a]].total_cmp(&disp[[row, b]]));
                if let Some(col) = nearest {
                    miss.candidate = Some(instances[col].id);
                    miss.observed = disp[[row, col]] as f32;
                }
            }
        }
        Ok(resolution)
    }

    fn apply_plan(
        &self,
        plan: &ClassPlan,
        cache: &mut ObjectCache,
        labels_t1: &mut FrameLabels,
        labels_t2: &mut FrameLabels,
        unresolved: &mut Vec<UnresolvedDisappearance>,
    ) -> Result<()> {
        let class_id = plan.class_id;
        let t1_clusters = plan.t1.clusters.cluster_ids();
        let t2_clusters = plan.t2.clusters.cluster_ids();
        let policy = self.config.association.disappearance;

        let mut row_ids = Vec::with_capacity(plan.rows.len());
        for row in &plan.rows {
            match *row {
                Row::Seeded(cluster) => {
                    let id = cache.mint_id();
                    let instance = Instance::new(
                        id,
                        class_id,
                        plan.t1.clusters.centers[cluster],
                        plan.t1.features.row(cluster).to_owned(),
                    );
                    cache.seed_instance(class_id, instance)?;
                    labels_t1.assign(class_id, t1_clusters[cluster], id)?;
                    row_ids.push(id);
                }
                Row::Cached(id) => row_ids.push(id),
            }
        }

        for (cluster, res) in plan.resolution.iter().enumerate() {
            let cluster_id = t1_clusters[cluster];
            match res {
                Ok(id) => labels_t1.assign(class_id, cluster_id, *id)?,
                Err(miss) => {
                    let fallback_id = cache.mint_id();
                    labels_t1.assign(class_id, cluster_id, fallback_id)?;
                    if plan.t2.clusters.is_empty() {
                        unresolved.push(self.report_disappearance(
                            cache,
                            class_id,
                            cluster_id,
                            plan.t1.clusters.centroids.counts[cluster],
                            miss,
                            fallback_id,
                            policy,
                        ));
                    } else {
                        log::debug!(
                            "class {class_id}: cluster {cluster_id} not tied to a track \
                             (nearest {:?} at {:.4}, expected <= {:.4}); labelled {fallback_id}",
                            miss.candidate,
                            miss.observed,
                            miss.expected
                        );
                    }
                }
            }
        }

        for (row, col, accepted) in plan.assignment.solved_pairs() {
            if accepted {
                let id = row_ids[row];
                labels_t2.assign(class_id, t2_clusters[col], id)?;
                let mut instance =
                    cache
                        .get(id)
                        .cloned()
                        .ok_or(AssocError::InvariantViolation {
                            class_id,
                            cluster_id: Some(t2_clusters[col]),
                            ids: vec![id],
                            reason: "matched track missing from cache",
                        })?;
                instance.observe(plan.t2.clusters.centers[col], plan.t2.features.row(col));
                cache.add_instance(class_id, instance)?;
            } else {
                self.start_track(plan, col, cache, labels_t2)?;
            }
        }

        for &col in &plan.assignment.unmatched_cols {
            self.start_track(plan, col, cache, labels_t2)?;
        }

        log::trace!(
            "class {class_id}: {} rows, {} matched, {} rejected, {} unmatched in t+1",
            plan.rows.len(),
            plan.assignment.matches.len(),
            plan.assignment.rejected.len(),
            plan.assignment.unmatched_cols.len()
        );
        Ok(())
    }

    /// New identity for frame-t+1 cluster `col`.
    fn start_track(
        &self,
        plan: &ClassPlan,
        col: usize,
        cache: &mut ObjectCache,
        labels_t2: &mut FrameLabels,
    ) -> Result<()> {
        let id = cache.mint_id();
        labels_t2.assign(plan.class_id, plan.t2.clusters.cluster_ids()[col], id)?;
        let instance = Instance::new(
            id,
            plan.class_id,
            plan.t2.clusters.centers[col],
            plan.t2.features.row(col).to_owned(),
        );
        cache.add_instance(plan.class_id, instance)
    }

    fn report_disappearance(
        &self,
        cache: &mut ObjectCache,
        class_id: ClassId,
        cluster_id: i32,
        point_count: usize,
        miss: &Miss,
        fallback_id: InstanceId,
        policy: DisappearancePolicy,
    ) -> UnresolvedDisappearance {
        log::warn!(
            "Unresolved disappearance: class {class_id} cluster {cluster_id} ({point_count} points), nearest track {:?} \
             displaced {:.4} m but flow allows {:.4} m; labelled {fallback_id}, policy {:?}",
            miss.candidate,
            miss.observed,
            miss.expected,
            policy
        );
        if let (DisappearancePolicy::ForceEvict, Some(candidate)) = (policy, miss.candidate) {
            cache.mark_for_eviction(candidate);
        }
        UnresolvedDisappearance {
            class_id,
            cluster_id,
            point_count,
            candidate: miss.candidate,
            observed_displacement: miss.observed,
            expected_displacement: miss.expected,
            fallback_id,
            policy,
        }
    }
}

fn side(frame: &PointFrame, class_id: ClassId, flow: Option<ArrayView2<'_, f32>>) -> Result<Side> {
    let clusters = class_clusters(frame, class_id, flow)?;
    let features = extract_centroids(frame, class_id, Some(frame.features()))?.means;
    Ok(Side { clusters, features })
}

fn stack_features(class_id: ClassId, instances: &[&Instance], width: usize) -> Result<Array2<f32>> {
    let mut features = Array2::zeros((instances.len(), width));
    for (mut row, inst) in features.rows_mut().into_iter().zip(instances) {
        if inst.feature.len() != width {
            log::error!(
                "class {class_id}: track {} has a {}-wide feature, frame has {width}",
                inst.id,
                inst.feature.len()
            );
            return Err(AssocError::ShapeMismatch {
                context: "cached track feature width",
                expected: width,
                got: inst.feature.len(),
            });
        }
        row.assign(&inst.feature);
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::assignment::KuhnMunkresSolver;
    use crate::tracker::frame::BACKGROUND_ID;
    use approx::assert_relative_eq;
    use ndarray::{Array1, array};

    /// One single-point cluster per entry: (class, position, feature).
    fn frame(points: &[(ClassId, [f32; 3], [f32; 2])]) -> PointFrame {
        let n = points.len();
        let mut positions = Array2::zeros((n, 3));
        let mut features = Array2::zeros((n, 2));
        for (i, (_, p, f)) in points.iter().enumerate() {
            positions.row_mut(i).assign(&ndarray::aview1(p));
            features.row_mut(i).assign(&ndarray::aview1(f));
        }
        PointFrame::new(
            positions,
            features,
            points.iter().map(|p| p.0).collect(),
            (0..n as i32).collect(),
        )
        .unwrap()
    }

    fn car(x: f32) -> (ClassId, [f32; 3], [f32; 2]) {
        (1, [x, 0.0, 0.0], [1.0, 0.0])
    }

    fn associator(life: i32) -> LongTermAssociator {
        LongTermAssociator::new(AssociationConfig::new(vec![1, 2], 1.0, 0.5, life)).unwrap()
    }

    #[test]
    fn test_identity_persists() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0)]);
        let f1 = frame(&[car(0.3)]);
        let f2 = frame(&[car(0.6)]);

        let out = assoc.associate(&f0, &f1, &mut cache, None).unwrap();
        assert_eq!(out.ids_t1, array![1]);
        assert_eq!(out.ids_t2, array![1]);
        assert_eq!(cache.get(1).unwrap().life, 3);
        assert_relative_eq!(cache.get(1).unwrap().center.x, 0.3);

        let out = assoc.associate(&f1, &f2, &mut cache, None).unwrap();
        assert_eq!(out.ids_t1, array![1]);
        assert_eq!(out.ids_t2, array![1]);
        assert_eq!(out.minted, 0);
        assert_eq!(cache.max_id(), 1);
    }

    #[test]
    fn test_reidentification_across_gap() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0)]);
        let f1 = frame(&[car(0.1)]);
        let gap = frame(&[]);
        let f3 = frame(&[car(0.2)]);

        assoc.associate(&f0, &f1, &mut cache, None).unwrap();
        let out = assoc.associate(&f1, &gap, &mut cache, None).unwrap();
        assert_eq!(out.ids_t1, array![1]);
        assert!(out.unresolved.is_empty());
        assert_eq!(cache.get(1).unwrap().life, 2);

        let out = assoc.associate(&gap, &f3, &mut cache, None).unwrap();
        assert_eq!(out.ids_t2, array![1]);
        assert_eq!(cache.get(1).unwrap().life, 3);
        assert_eq!(cache.max_id(), 1);
    }

    #[test]
    fn test_evicted_track_is_never_rematched() {
        let assoc = associator(1);
        let mut cache = assoc.new_cache();
        let obj = frame(&[car(0.0)]);
        let gap = frame(&[]);

        assoc.associate(&obj, &obj, &mut cache, None).unwrap();
        assoc.associate(&obj, &gap, &mut cache, None).unwrap();
        assert_eq!(cache.get(1).unwrap().life, 0);
        assoc.associate(&gap, &gap, &mut cache, None).unwrap();
        assert!(cache.snapshot(1).is_empty());

        let out = assoc.associate(&gap, &obj, &mut cache, None).unwrap();
        assert_eq!(out.ids_t2, array![2]);
        assert_eq!(cache.max_id(), 2);
    }

    #[test]
    fn test_cardinality_mismatch_against_cache() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0)]);
        let f1 = frame(&[car(0.2), car(10.0), car(-10.0)]);

        let out = assoc.associate(&f0, &f1, &mut cache, None).unwrap();
        assert_eq!(out.ids_t2, array![1, 2, 3]);
        assert_eq!(out.minted, 3);
        assert_eq!(cache.class_len(1), 3);
    }

    #[test]
    fn test_feature_gate_creates_new_identity() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0)]);
        let f1 = frame(&[(1, [0.1, 0.0, 0.0], [0.0, 1.0])]);

        let out = assoc.associate(&f0, &f1, &mut cache, None).unwrap();
        assert_eq!(out.ids_t1, array![1]);
        assert_eq!(out.ids_t2, array![2]);
        // The seeded track missed and keeps its one-short life.
        assert_eq!(cache.get(1).unwrap().life, 2);
        assert_eq!(cache.get(2).unwrap().life, 3);
    }

    #[test]
    fn test_matched_feature_is_averaged() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[(1, [0.0, 0.0, 0.0], [1.0, 0.0])]);
        let f1 = frame(&[(1, [0.1, 0.0, 0.0], [1.0, 0.4])]);

        assoc.associate(&f0, &f1, &mut cache, None).unwrap();
        let inst = cache.get(1).unwrap();
        assert_relative_eq!(inst.feature[1], 0.2);
        assert_relative_eq!(inst.center.x, 0.1);
    }

    fn stale_cache(assoc: &LongTermAssociator) -> ObjectCache {
        let mut cache = assoc.new_cache();
        let id = cache.mint_id();
        cache
            .add_instance(1, Instance::new(id, 1, Vector3::zeros(), array![1.0, 0.0]))
            .unwrap();
        cache
    }

    #[test]
    fn test_unresolved_disappearance_carry_forward() {
        let assoc = associator(3);
        let mut cache = stale_cache(&assoc);
        let t1 = frame(&[car(5.0)]);
        let gap = frame(&[]);

        let out = assoc.associate(&t1, &gap, &mut cache, None).unwrap();
        assert_eq!(out.unresolved.len(), 1);
        let report = &out.unresolved[0];
        assert_eq!(report.candidate, Some(1));
        assert_relative_eq!(report.observed_displacement, 5.0);
        assert_relative_eq!(report.expected_displacement, DISPLACEMENT_TOLERANCE);
        assert_eq!(report.fallback_id, 2);
        assert_eq!(report.point_count, 1);
        assert_eq!(out.ids_t1, array![2]);
        assert!(!cache.contains(2));

        assoc.associate(&gap, &gap, &mut cache, None).unwrap();
        assert!(cache.contains(1));
    }

    #[test]
    fn test_unresolved_disappearance_force_evict() {
        let config = AssociationConfig::new(vec![1], 1.0, 0.5, 3)
            .with_disappearance_policy(DisappearancePolicy::ForceEvict);
        let assoc = LongTermAssociator::new(config).unwrap();
        let mut cache = stale_cache(&assoc);
        let t1 = frame(&[car(5.0)]);
        let gap = frame(&[]);

        let out = assoc.associate(&t1, &gap, &mut cache, None).unwrap();
        assert_eq!(out.unresolved[0].policy, DisappearancePolicy::ForceEvict);
        // Still present until the next step ages the cache.
        assert!(cache.contains(1));
        assoc.associate(&gap, &gap, &mut cache, None).unwrap();
        assert!(!cache.contains(1));
    }

    #[test]
    fn test_flow_explains_displacement() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0)]);
        let f1 = frame(&[car(0.5)]);
        let gap = frame(&[]);
        assoc.associate(&f0, &f1, &mut cache, None).unwrap();

        let flow = array![[0.8f32, 0.0, 0.0]];
        let out = assoc
            .associate(&f1, &gap, &mut cache, Some(flow.view()))
            .unwrap();
        assert!(out.unresolved.is_empty());
        assert_eq!(out.ids_t1, array![1]);
    }

    #[test]
    fn test_cached_center_is_the_left_hand_side() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0)]);
        let f1 = frame(&[car(0.5)]);
        assoc.associate(&f0, &f1, &mut cache, None).unwrap();

        // 0.9 from the cached center, 1.7 from the flow-adjusted centroid.
        let f2 = frame(&[car(-0.4)]);
        let flow = array![[0.8f32, 0.0, 0.0]];
        let out = assoc
            .associate(&f1, &f2, &mut cache, Some(flow.view()))
            .unwrap();
        assert_eq!(out.ids_t1, array![1]);
        assert_eq!(out.ids_t2, array![1]);
        assert_eq!(out.minted, 0);
    }

    #[test]
    fn test_empty_scan_after_featured_step() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0)]);
        let f1 = frame(&[car(0.2)]);
        assoc.associate(&f0, &f1, &mut cache, None).unwrap();

        let out = assoc
            .associate(&f1, &PointFrame::empty(), &mut cache, None)
            .unwrap();
        assert_eq!(out.ids_t1, array![1]);
        assert_eq!(out.ids_t2.len(), 0);
        assert!(out.unresolved.is_empty());
        assert_eq!(cache.get(1).unwrap().life, 2);

        // A scan without a feature block matches on distance alone.
        let bare =
            PointFrame::without_features(array![[0.3f32, 0.0, 0.0]], array![1], array![0]).unwrap();
        let out = assoc
            .associate(&PointFrame::empty(), &bare, &mut cache, None)
            .unwrap();
        assert_eq!(out.ids_t2, array![1]);
        assert_eq!(cache.get(1).unwrap().life, 3);
    }

    #[test]
    fn test_classes_are_independent() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let f0 = frame(&[car(0.0), (2, [0.0, 0.0, 0.0], [1.0, 0.0]), (5, [1.0, 1.0, 1.0], [0.0, 0.0])]);
        let f1 = frame(&[(2, [0.1, 0.0, 0.0], [1.0, 0.0]), car(0.1)]);

        let out = assoc.associate(&f0, &f1, &mut cache, None).unwrap();
        assert_eq!(out.ids_t1, array![1, 2, BACKGROUND_ID]);
        assert_eq!(out.ids_t2, array![2, 1]);
        assert_eq!(cache.class_len(1), 1);
        assert_eq!(cache.class_len(2), 1);
    }

    #[test]
    fn test_deterministic_and_parallel_equivalent() {
        let f0 = frame(&[car(0.0), car(3.0), (2, [8.0, 0.0, 0.0], [0.0, 1.0])]);
        let f1 = frame(&[car(3.2), (2, [8.1, 0.0, 0.0], [0.0, 1.0]), car(0.3), car(12.0)]);

        let sequential = associator(3);
        let parallel = LongTermAssociator::with_solver(
            AssociationConfig::new(vec![1, 2], 1.0, 0.5, 3).with_parallel(true),
            Box::new(KuhnMunkresSolver::default()),
        )
        .unwrap();

        let mut a = sequential.new_cache();
        let mut b = a.clone();
        let mut c = parallel.new_cache();
        let out_a = sequential.associate(&f0, &f1, &mut a, None).unwrap();
        let out_b = sequential.associate(&f0, &f1, &mut b, None).unwrap();
        let out_c = parallel.associate(&f0, &f1, &mut c, None).unwrap();

        assert_eq!(out_a, out_b);
        assert_eq!(a, b);
        assert_eq!(out_a, out_c);
        assert_eq!(a, c);
        assert_eq!(out_a.ids_t2, array![2, 4, 1, 3]);
    }

    #[test]
    fn test_error_leaves_cache_untouched() {
        let assoc = associator(3);
        let mut cache = assoc.new_cache();
        let id = cache.mint_id();
        cache
            .add_instance(1, Instance::new(id, 1, Vector3::zeros(), Array1::zeros(5)))
            .unwrap();
        let before = cache.clone();

        let t2 = frame(&[car(0.0)]);
        let result = assoc.associate(&frame(&[]), &t2, &mut cache, None);
        assert!(matches!(result, Err(AssocError::ShapeMismatch { .. })));
        assert_eq!(cache, before);
    }

    #[test]
    fn test_cache_life_must_match_config() {
        let assoc = associator(3);
        let mut cache = ObjectCache::new(5);
        let f = frame(&[]);
        assert!(assoc.associate(&f, &f, &mut cache, None).is_err());
        assert!(LongTermAssociator::new(AssociationConfig::new(vec![1], 1.0, 0.5, 0)).is_err());
    }
}
