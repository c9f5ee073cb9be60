mod assignment;
mod cache;
mod centroid;
mod cost;
mod frame;
mod instance;
mod labels;
mod long_term;
mod output;
mod sequence;
mod short_term;

pub use assignment::{
    AssignmentResult, AssignmentSolver, KuhnMunkresSolver, LapjvSolver, linear_assignment,
    solve_assignment,
};
pub use cache::ObjectCache;
pub use centroid::{ClassClusters, ClusterCentroids, class_clusters, extract_centroids};
pub use cost::{
    CostGates, INFEASIBLE_COST, NORM_EPS, association_cost, distance_matrix, feature_dissimilarity,
    is_feasible, l2_normalize_rows,
};
pub use frame::{BACKGROUND_ID, ClassId, InstanceId, PointFrame, UNCLUSTERED};
pub use instance::{EVICTION_THRESHOLD, IdAllocator, Instance};
pub use long_term::{DISPLACEMENT_TOLERANCE, LongTermAssociator};
pub use output::{AssociationOutput, UnresolvedDisappearance};
pub use sequence::{AssociationMode, SceneFrame, SequenceTracker};
pub use short_term::ShortTermAssociator;
