//! Persistent object track and id issuance.

use nalgebra::Vector3;
use ndarray::{Array1, ArrayView1};

use crate::tracker::frame::{BACKGROUND_ID, ClassId, InstanceId};

/// Instances whose life falls below this value are evicted.
pub const EVICTION_THRESHOLD: i32 = 0;

/// A track kept in the object cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Global instance id, never [`BACKGROUND_ID`]
    pub id: InstanceId,
    /// Semantic class the track belongs to
    pub class_id: ClassId,
    /// Remaining steps before eviction
    pub life: i32,
    /// Last observed centroid
    pub center: Vector3<f32>,
    /// Running appearance descriptor
    pub feature: Array1<f32>,
}

impl Instance {
    /// Create an instance from an observation. The cache sets `life` on insert.
    pub fn new(
        id: InstanceId,
        class_id: ClassId,
        center: Vector3<f32>,
        feature: Array1<f32>,
    ) -> Self {
        Self {
            id,
            class_id,
            life: 0,
            center,
            feature,
        }
    }

    /// Absorb a matched observation: the center jumps to the new centroid and
    /// the feature becomes the mean of the old and new descriptors.
    pub fn observe(&mut self, center: Vector3<f32>, feature: ArrayView1<'_, f32>) {
        self.center = center;
        if self.feature.len() == feature.len() {
            self.feature = (&self.feature + &feature) / 2.0;
        } else {
            self.feature = feature.to_owned();
        }
    }

    /// One step without a match.
    #[inline]
    pub fn decay(&mut self) {
        self.life -= 1;
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.life < EVICTION_THRESHOLD
    }
}

/// Issues fresh instance ids above a high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdAllocator {
    max_id: InstanceId,
}

impl IdAllocator {
    /// Start issuing after `max_id`.
    pub fn new(max_id: InstanceId) -> Self {
        Self { max_id }
    }

    pub fn mint(&mut self) -> InstanceId {
        self.max_id += 1;
        self.max_id
    }

    /// Highest id issued so far (or the seed).
    pub fn max_id(&self) -> InstanceId {
        self.max_id
    }

    /// Raise the high-water mark to cover an externally issued id.
    pub fn observe(&mut self, id: InstanceId) {
        if id != BACKGROUND_ID {
            self.max_id = self.max_id.max(id);
        }
    }
}
