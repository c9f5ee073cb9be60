//! Builder for assembling a `PointFrame` from per-point records.

use ndarray::{Array1, Array2};

use crate::error::{AssocError, Result};
use crate::tracker::{ClassId, PointFrame, UNCLUSTERED};

/// Collects points one at a time and packs them into a [`PointFrame`].
///
/// Feature vectors are optional, but every point must then carry one of the
/// same width.
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    positions: Vec<[f32; 3]>,
    features: Vec<Vec<f32>>,
    class_ids: Vec<ClassId>,
    cluster_ids: Vec<i32>,
}

impl FrameBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            positions: Vec::with_capacity(n),
            features: Vec::with_capacity(n),
            class_ids: Vec::with_capacity(n),
            cluster_ids: Vec::with_capacity(n),
        }
    }

    /// Add a clustered point without a feature vector.
    pub fn point(mut self, position: [f32; 3], class_id: ClassId, cluster_id: i32) -> Self {
        self.push(position, &[], class_id, cluster_id);
        self
    }

    /// Add a clustered point with its feature vector.
    pub fn point_with_feature(
        mut self,
        position: [f32; 3],
        feature: &[f32],
        class_id: ClassId,
        cluster_id: i32,
    ) -> Self {
        self.push(position, feature, class_id, cluster_id);
        self
    }

    /// Add a point that belongs to no cluster.
    pub fn noise(mut self, position: [f32; 3], class_id: ClassId) -> Self {
        self.push(position, &[], class_id, UNCLUSTERED);
        self
    }

    pub fn push(&mut self, position: [f32; 3], feature: &[f32], class_id: ClassId, cluster_id: i32) {
        self.positions.push(position);
        self.features.push(feature.to_vec());
        self.class_ids.push(class_id);
        self.cluster_ids.push(cluster_id);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Build the final frame.
    ///
    /// The feature width is the widest vector pushed; a point with a
    /// different non-zero width is a `ShapeMismatch`, points without a
    /// feature get zeros.
    pub fn build(self) -> Result<PointFrame> {
        let n = self.positions.len();
        let dim = self.features.iter().map(Vec::len).max().unwrap_or(0);

        let mut features = Array2::zeros((n, dim));
        for (mut row, feature) in features.rows_mut().into_iter().zip(&self.features) {
            match feature.len() {
                0 => {}
                len if len == dim => row.assign(&Array1::from(feature.clone())),
                len => {
                    return Err(AssocError::ShapeMismatch {
                        context: "point feature width",
                        expected: dim,
                        got: len,
                    });
                }
            }
        }

        let positions = Array2::from_shape_fn((n, 3), |(i, j)| self.positions[i][j]);
        PointFrame::new(
            positions,
            features,
            Array1::from(self.class_ids),
            Array1::from(self.cluster_ids),
        )
    }
}
