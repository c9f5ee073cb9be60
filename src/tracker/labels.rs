//! Per-point id arrays with invariant checks.

use std::collections::HashMap;

use ndarray::{Array1, ArrayView1};

use crate::error::{AssocError, Result};
use crate::tracker::frame::{BACKGROUND_ID, ClassId, InstanceId, PointFrame, UNCLUSTERED};

/// Output ids of one frame under construction.
///
/// Every write goes through [`assign`](Self::assign), which refuses to give a
/// cluster a second id or to hand one id to two clusters.
#[derive(Debug)]
pub struct FrameLabels {
    ids: Array1<InstanceId>,
    members: HashMap<(ClassId, i32), Vec<usize>>,
    owners: HashMap<InstanceId, (ClassId, i32)>,
}

impl FrameLabels {
    pub fn new(frame: &PointFrame) -> Self {
        let mut members: HashMap<(ClassId, i32), Vec<usize>> = HashMap::new();
        for (i, (&c, &k)) in frame
            .class_ids()
            .iter()
            .zip(frame.cluster_ids().iter())
            .enumerate()
        {
            if k != UNCLUSTERED {
                members.entry((c, k)).or_default().push(i);
            }
        }
        Self {
            ids: frame.background_ids(),
            members,
            owners: HashMap::new(),
        }
    }

    /// Label every point of `(class_id, cluster_id)` with `id`.
    pub fn assign(&mut self, class_id: ClassId, cluster_id: i32, id: InstanceId) -> Result<()> {
        if id == BACKGROUND_ID {
            return Err(AssocError::InvariantViolation {
                class_id,
                cluster_id: Some(cluster_id),
                ids: vec![id],
                reason: "foreground cluster labelled with the background id",
            });
        }
        if let Some(&(owner_class, owner_cluster)) = self.owners.get(&id) {
            if (owner_class, owner_cluster) != (class_id, cluster_id) {
                return Err(AssocError::InvariantViolation {
                    class_id,
                    cluster_id: Some(cluster_id),
                    ids: vec![id],
                    reason: "id already labels another cluster in this frame",
                });
            }
        }

        let points = self
            .members
            .get(&(class_id, cluster_id))
            .map(Vec::as_slice)
            .unwrap_or_default();
        if let Some(&first) = points.first() {
            let current = self.ids[first];
            if current != BACKGROUND_ID && current != id {
                return Err(AssocError::InvariantViolation {
                    class_id,
                    cluster_id: Some(cluster_id),
                    ids: vec![current, id],
                    reason: "cluster would carry two ids",
                });
            }
        }
        for &i in points {
            self.ids[i] = id;
        }
        self.owners.insert(id, (class_id, cluster_id));
        Ok(())
    }

    /// The single id a previous step gave this cluster, if any.
    ///
    /// `None` when the cluster was background in `previous`.
    pub fn previous_id(
        &self,
        previous: ArrayView1<'_, InstanceId>,
        class_id: ClassId,
        cluster_id: i32,
    ) -> Result<Option<InstanceId>> {
        if previous.len() != self.ids.len() {
            return Err(AssocError::ShapeMismatch {
                context: "previous id map",
                expected: self.ids.len(),
                got: previous.len(),
            });
        }
        let Some(points) = self.members.get(&(class_id, cluster_id)) else {
            return Ok(None);
        };
        let first = previous[points[0]];
        if let Some(other) = points.iter().map(|&i| previous[i]).find(|&v| v != first) {
            return Err(AssocError::InvariantViolation {
                class_id,
                cluster_id: Some(cluster_id),
                ids: vec![first, other],
                reason: "previous id map splits a cluster",
            });
        }
        Ok((first != BACKGROUND_ID).then_some(first))
    }

    pub fn into_ids(self) -> Array1<InstanceId> {
        self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn frame() -> PointFrame {
        PointFrame::without_features(
            Array2::zeros((5, 3)),
            array![1, 1, 1, 2, 1],
            array![0, 0, 1, 0, UNCLUSTERED],
        )
        .unwrap()
    }

    #[test]
    fn test_assign_whole_cluster() {
        let mut labels = FrameLabels::new(&frame());
        labels.assign(1, 0, 4).unwrap();
        labels.assign(2, 0, 9).unwrap();
        assert_eq!(labels.into_ids(), array![4, 4, 0, 9, 0]);
    }

    #[test]
    fn test_conflicts_are_fatal() {
        let mut labels = FrameLabels::new(&frame());
        labels.assign(1, 0, 4).unwrap();
        // Re-assigning the same id is idempotent.
        labels.assign(1, 0, 4).unwrap();
        assert!(labels.assign(1, 1, 4).is_err());
        assert!(labels.assign(1, 0, 5).is_err());
        assert!(labels.assign(2, 0, BACKGROUND_ID).is_err());
    }

    #[test]
    fn test_previous_id() {
        let labels = FrameLabels::new(&frame());
        let prev = array![3, 3, 0, 8, 0];
        assert_eq!(labels.previous_id(prev.view(), 1, 0).unwrap(), Some(3));
        assert_eq!(labels.previous_id(prev.view(), 1, 1).unwrap(), None);

        let split = array![3, 4, 0, 8, 0];
        assert!(labels.previous_id(split.view(), 1, 0).is_err());
    }
}
