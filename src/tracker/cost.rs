//! Association cost between two centroid sets.

use nalgebra::Vector3;
use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{AssocError, Result};

/// Cost of a pair that must never be chosen over a feasible one.
pub const INFEASIBLE_COST: f64 = 1e8;

/// Added to feature norms before normalizing.
pub const NORM_EPS: f32 = 1e-6;

/// Pairwise Euclidean distance matrix between `a` (rows) and `b` (columns).
pub fn distance_matrix(a: &[Vector3<f32>], b: &[Vector3<f32>]) -> Array2<f64> {
    let mut dists = Array2::zeros((a.len(), b.len()));
    for (i, p) in a.iter().enumerate() {
        for (j, q) in b.iter().enumerate() {
            dists[[i, j]] = (p - q).norm() as f64;
        }
    }
    dists
}

/// Scale each row to unit length, guarding all-zero rows.
pub fn l2_normalize_rows(features: ArrayView2<'_, f32>) -> Array2<f32> {
    let norms = features.map_axis(Axis(1), |row| row.dot(&row).sqrt() + NORM_EPS);
    let mut normalized = features.to_owned();
    for (mut row, norm) in normalized.rows_mut().into_iter().zip(norms.iter()) {
        row /= *norm;
    }
    normalized
}

/// `1 - cosine_similarity` between every row of `a` and every row of `b`.
pub fn feature_dissimilarity(
    a: ArrayView2<'_, f32>,
    b: ArrayView2<'_, f32>,
) -> Result<Array2<f64>> {
    if a.ncols() != b.ncols() {
        return Err(AssocError::ShapeMismatch {
            context: "feature width",
            expected: a.ncols(),
            got: b.ncols(),
        });
    }
    let an = l2_normalize_rows(a);
    let bn = l2_normalize_rows(b);
    Ok(an.dot(&bn.t()).mapv(|s| 1.0 - s as f64))
}

/// Thresholds applied by [`association_cost`].
#[derive(Debug, Clone, Copy)]
pub struct CostGates {
    pub max_dist: f32,
    pub max_feat: f32,
}

/// Full association cost: gated distance plus, when both feature blocks are
/// given, gated cosine dissimilarity.
///
/// Gated entries are pinned at [`INFEASIBLE_COST`] so the matrix keeps its
/// m×n shape for the solver.
pub fn association_cost(
    centers_a: &[Vector3<f32>],
    centers_b: &[Vector3<f32>],
    features: Option<(ArrayView2<'_, f32>, ArrayView2<'_, f32>)>,
    gates: CostGates,
) -> Result<Array2<f64>> {
    let mut cost = distance_matrix(centers_a, centers_b);
    let max_dist = gates.max_dist as f64;
    cost.mapv_inplace(|d| if d > max_dist { INFEASIBLE_COST } else { d });

    if let Some((fa, fb)) = features {
        if fa.nrows() != centers_a.len() || fb.nrows() != centers_b.len() {
            return Err(AssocError::ShapeMismatch {
                context: "feature rows vs centers",
                expected: centers_a.len() + centers_b.len(),
                got: fa.nrows() + fb.nrows(),
            });
        }
        let max_feat = gates.max_feat as f64;
        let dissim = feature_dissimilarity(fa, fb)?;
        cost.zip_mut_with(&dissim, |c, &f| {
            let f = if f > max_feat { INFEASIBLE_COST } else { f };
            *c = (*c + f).min(INFEASIBLE_COST);
        });
    }

    Ok(cost)
}

/// Whether a cost cell survived gating.
#[inline]
pub fn is_feasible(cost: f64) -> bool {
    cost < INFEASIBLE_COST
}
