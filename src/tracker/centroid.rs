//! Per-class cluster centroids.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{AssocError, Result};
use crate::tracker::frame::{ClassId, PointFrame, UNCLUSTERED};

/// Clusters of one semantic class in one frame.
///
/// `means` row `i` belongs to `cluster_ids[i]`; ids are ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterCentroids {
    pub cluster_ids: Vec<i32>,
    pub means: Array2<f32>,
    pub counts: Vec<usize>,
}

impl ClusterCentroids {
    pub fn empty(dim: usize) -> Self {
        Self {
            cluster_ids: Vec::new(),
            means: Array2::zeros((0, dim)),
            counts: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cluster_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cluster_ids.is_empty()
    }

    pub fn mean(&self, i: usize) -> ArrayView1<'_, f32> {
        self.means.row(i)
    }

    /// Means as 3D vectors. Only meaningful for 3-column aggregates.
    pub fn centers(&self) -> Vec<Vector3<f32>> {
        to_vectors(self.means.view())
    }
}

/// Group the points of `class_id` by local cluster and average them.
///
/// Averages `values` when given (flow, features, ...), positions otherwise.
/// Noise points are skipped. A class with no clustered points yields an empty
/// result, never an error.
pub fn extract_centroids(
    frame: &PointFrame,
    class_id: ClassId,
    values: Option<ArrayView2<'_, f32>>,
) -> Result<ClusterCentroids> {
    let positions = frame.positions();
    let values = match &values {
        Some(v) => v.view(),
        None => positions.view(),
    };
    if values.nrows() != frame.len() {
        return Err(AssocError::ShapeMismatch {
            context: "aggregated values (rows)",
            expected: frame.len(),
            got: values.nrows(),
        });
    }
    let dim = values.ncols();

    let mut sums: BTreeMap<i32, (Vec<f64>, usize)> = BTreeMap::new();
    for (i, (&c, &k)) in frame
        .class_ids()
        .iter()
        .zip(frame.cluster_ids().iter())
        .enumerate()
    {
        if c != class_id || k == UNCLUSTERED {
            continue;
        }
        let (sum, count) = sums.entry(k).or_insert_with(|| (vec![0.0; dim], 0));
        for (acc, v) in sum.iter_mut().zip(values.row(i).iter()) {
            *acc += *v as f64;
        }
        *count += 1;
    }

    if sums.is_empty() {
        return Ok(ClusterCentroids::empty(dim));
    }

    let mut means = Array2::zeros((sums.len(), dim));
    let mut cluster_ids = Vec::with_capacity(sums.len());
    let mut counts = Vec::with_capacity(sums.len());
    for (row, (cluster_id, (sum, count))) in sums.into_iter().enumerate() {
        for (j, s) in sum.into_iter().enumerate() {
            means[[row, j]] = (s / count as f64) as f32;
        }
        cluster_ids.push(cluster_id);
        counts.push(count);
    }

    Ok(ClusterCentroids {
        cluster_ids,
        means,
        counts,
    })
}

/// Clusters of a class with their (optionally flow-propagated) centers.
#[derive(Debug, Clone)]
pub struct ClassClusters {
    pub centroids: ClusterCentroids,
    /// Centroids shifted by the cluster's mean flow.
    pub centers: Vec<Vector3<f32>>,
    /// Magnitude of each cluster's mean flow; zero without flow.
    pub flow_norms: Vec<f32>,
}

impl ClassClusters {
    #[inline]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn cluster_ids(&self) -> &[i32] {
        &self.centroids.cluster_ids
    }
}

/// Centroids of `class_id`, advanced by the mean of a per-point `flow` (N×3).
pub fn class_clusters(
    frame: &PointFrame,
    class_id: ClassId,
    flow: Option<ArrayView2<'_, f32>>,
) -> Result<ClassClusters> {
    let centroids = extract_centroids(frame, class_id, None)?;
    let mut centers = centroids.centers();
    let mut flow_norms = vec![0.0; centers.len()];

    if let Some(flow) = flow {
        if flow.ncols() != 3 {
            return Err(AssocError::ShapeMismatch {
                context: "flow (columns)",
                expected: 3,
                got: flow.ncols(),
            });
        }
        let mean_flow = extract_centroids(frame, class_id, Some(flow))?;
        for ((center, norm), f) in centers
            .iter_mut()
            .zip(flow_norms.iter_mut())
            .zip(mean_flow.centers())
        {
            *center += f;
            *norm = f.norm();
        }
    }

    Ok(ClassClusters {
        centroids,
        centers,
        flow_norms,
    })
}

/// Convert the rows of an N×3 block into vectors.
pub fn to_vectors(block: ArrayView2<'_, f32>) -> Vec<Vector3<f32>> {
    block
        .rows()
        .into_iter()
        .map(|r| Vector3::new(r[0], r[1], r[2]))
        .collect()
}
