//! Segmented and clustered LiDAR frame.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{AssocError, Result};

/// Semantic class id produced by the segmentation stage.
pub type ClassId = u32;

/// Global instance id. See [`BACKGROUND_ID`].
pub type InstanceId = u32;

/// Local cluster id of points the clustering stage left as noise.
pub const UNCLUSTERED: i32 = -1;

/// Output id of points that belong to no tracked instance.
pub const BACKGROUND_ID: InstanceId = 0;

/// One frame of ego-compensated points with per-point labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFrame {
    positions: Array2<f32>,
    features: Array2<f32>,
    class_ids: Array1<ClassId>,
    cluster_ids: Array1<i32>,
}

impl PointFrame {
    /// Create a frame from its column blocks.
    ///
    /// `positions` must be N×3; `features` N×F (F may be zero); both label
    /// arrays must hold N entries.
    pub fn new(
        positions: Array2<f32>,
        features: Array2<f32>,
        class_ids: Array1<ClassId>,
        cluster_ids: Array1<i32>,
    ) -> Result<Self> {
        let n = positions.nrows();
        if positions.ncols() != 3 {
            return Err(AssocError::ShapeMismatch {
                context: "point positions (columns)",
                expected: 3,
                got: positions.ncols(),
            });
        }
        check_rows("point features", n, features.nrows())?;
        check_rows("semantic class ids", n, class_ids.len())?;
        check_rows("cluster ids", n, cluster_ids.len())?;

        Ok(Self {
            positions,
            features,
            class_ids,
            cluster_ids,
        })
    }

    /// Frame without a feature block.
    pub fn without_features(
        positions: Array2<f32>,
        class_ids: Array1<ClassId>,
        cluster_ids: Array1<i32>,
    ) -> Result<Self> {
        let features = Array2::zeros((positions.nrows(), 0));
        Self::new(positions, features, class_ids, cluster_ids)
    }

    pub fn empty() -> Self {
        Self {
            positions: Array2::zeros((0, 3)),
            features: Array2::zeros((0, 0)),
            class_ids: Array1::zeros(0),
            cluster_ids: Array1::zeros(0),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn positions(&self) -> ArrayView2<'_, f32> {
        self.positions.view()
    }

    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn feature_dim(&self) -> usize {
        self.features.ncols()
    }

    pub fn class_ids(&self) -> ArrayView1<'_, ClassId> {
        self.class_ids.view()
    }

    pub fn cluster_ids(&self) -> ArrayView1<'_, i32> {
        self.cluster_ids.view()
    }

    /// Fresh all-background id array sized for this frame.
    pub fn background_ids(&self) -> Array1<InstanceId> {
        Array1::from_elem(self.len(), BACKGROUND_ID)
    }
}

fn check_rows(context: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(AssocError::ShapeMismatch {
            context,
            expected,
            got,
        });
    }
    Ok(())
}
