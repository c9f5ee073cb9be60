//! Session driver: feeds consecutive frames of a scene to an associator.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::AssociationConfig;
use crate::error::Result;
use crate::tracker::assignment::{AssignmentSolver, LapjvSolver};
use crate::tracker::cache::ObjectCache;
use crate::tracker::frame::{InstanceId, PointFrame};
use crate::tracker::instance::IdAllocator;
use crate::tracker::long_term::LongTermAssociator;
use crate::tracker::output::AssociationOutput;
use crate::tracker::short_term::ShortTermAssociator;

/// Which associator drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationMode {
    /// Previous frame only.
    ShortTerm,
    /// Object cache with re-identification.
    #[default]
    LongTerm,
}

/// One input frame tagged with the scene it belongs to.
#[derive(Debug, Clone)]
pub struct SceneFrame {
    pub scene: String,
    pub frame: PointFrame,
    /// Per-point motion from this frame to the next one (N×3).
    pub flow: Option<Array2<f32>>,
}

impl SceneFrame {
    pub fn new(scene: impl Into<String>, frame: PointFrame) -> Self {
        Self {
            scene: scene.into(),
            frame,
            flow: None,
        }
    }

    pub fn with_flow(mut self, flow: Array2<f32>) -> Self {
        self.flow = Some(flow);
        self
    }
}

enum Engine {
    ShortTerm {
        associator: ShortTermAssociator,
        ids: IdAllocator,
        prev_ids: Option<Array1<InstanceId>>,
    },
    LongTerm {
        associator: LongTermAssociator,
        cache: ObjectCache,
    },
}

/// Tracks instances through a stream of frames, one scene at a time.
///
/// The first frame of every scene only primes the tracker; each later frame
/// is associated with its predecessor. A new scene token discards all state,
/// including the id counter.
pub struct SequenceTracker {
    engine: Engine,
    previous: Option<SceneFrame>,
    frame_id: u32,
}

impl SequenceTracker {
    pub fn new(config: AssociationConfig, mode: AssociationMode) -> Result<Self> {
        Self::with_solver(config, mode, Box::new(LapjvSolver))
    }

    pub fn with_solver(
        config: AssociationConfig,
        mode: AssociationMode,
        solver: Box<dyn AssignmentSolver>,
    ) -> Result<Self> {
        let engine = match mode {
            AssociationMode::ShortTerm => Engine::ShortTerm {
                associator: ShortTermAssociator::with_solver(config, solver)?,
                ids: IdAllocator::default(),
                prev_ids: None,
            },
            AssociationMode::LongTerm => {
                let associator = LongTermAssociator::with_solver(config, solver)?;
                let cache = associator.new_cache();
                Engine::LongTerm { associator, cache }
            }
        };
        Ok(Self {
            engine,
            previous: None,
            frame_id: 0,
        })
    }

    pub fn mode(&self) -> AssociationMode {
        match self.engine {
            Engine::ShortTerm { .. } => AssociationMode::ShortTerm,
            Engine::LongTerm { .. } => AssociationMode::LongTerm,
        }
    }

    /// Frames accepted in the current scene.
    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn scene(&self) -> Option<&str> {
        self.previous.as_ref().map(|f| f.scene.as_str())
    }

    /// Highest id issued in the current scene.
    pub fn max_id(&self) -> InstanceId {
        match &self.engine {
            Engine::ShortTerm { ids, .. } => ids.max_id(),
            Engine::LongTerm { cache, .. } => cache.max_id(),
        }
    }

    /// The object cache in long-term mode.
    pub fn cache(&self) -> Option<&ObjectCache> {
        match &self.engine {
            Engine::LongTerm { cache, .. } => Some(cache),
            Engine::ShortTerm { .. } => None,
        }
    }

    /// Forget the current scene.
    pub fn reset(&mut self) {
        match &mut self.engine {
            Engine::ShortTerm { ids, prev_ids, .. } => {
                *ids = IdAllocator::default();
                *prev_ids = None;
            }
            Engine::LongTerm { cache, .. } => cache.clear(false),
        }
        self.previous = None;
        self.frame_id = 0;
    }

    /// Feed the next frame.
    ///
    /// Returns `None` for the first frame of a scene, otherwise the ids of the
    /// (previous, current) pair. On error the tracker keeps its state and the
    /// frame is dropped.
    pub fn update(&mut self, input: SceneFrame) -> Result<Option<AssociationOutput>> {
        let previous = match self.previous.take() {
            Some(prev) if prev.scene == input.scene => prev,
            Some(prev) => {
                log::info!("Scene change {} -> {}, resetting", prev.scene, input.scene);
                self.reset();
                return Ok(self.prime(input));
            }
            None => {
                self.reset();
                return Ok(self.prime(input));
            }
        };

        let flow = previous.flow.as_ref().map(|f| f.view());
        let result = match &mut self.engine {
            Engine::ShortTerm {
                associator,
                ids,
                prev_ids,
            } => associator
                .associate(
                    &previous.frame,
                    &input.frame,
                    prev_ids.as_ref().map(|p| p.view()),
                    ids,
                    flow,
                )
                .inspect(|out| *prev_ids = Some(out.ids_t2.clone())),
            Engine::LongTerm { associator, cache } => {
                associator.associate(&previous.frame, &input.frame, cache, flow)
            }
        };

        match result {
            Ok(out) => {
                self.frame_id += 1;
                self.previous = Some(input);
                Ok(Some(out))
            }
            Err(e) => {
                log::warn!("Frame {} of scene {} rejected: {e}", self.frame_id + 1, input.scene);
                self.previous = Some(previous);
                Err(e)
            }
        }
    }

    fn prime(&mut self, input: SceneFrame) -> Option<AssociationOutput> {
        self.frame_id = 1;
        self.previous = Some(input);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::frame::ClassId;
    use ndarray::array;

    fn frame(xs: &[f32], class_id: ClassId) -> PointFrame {
        let n = xs.len();
        let mut positions = Array2::zeros((n, 3));
        for (i, &x) in xs.iter().enumerate() {
            positions[[i, 0]] = x;
        }
        PointFrame::without_features(positions, Array1::from_elem(n, class_id), (0..n as i32).collect())
            .unwrap()
    }

    fn tracker(mode: AssociationMode) -> SequenceTracker {
        SequenceTracker::new(AssociationConfig::new(vec![1], 1.0, 0.5, 2), mode).unwrap()
    }

    #[test]
    fn test_first_frame_primes() {
        let mut t = tracker(AssociationMode::LongTerm);
        assert!(t.update(SceneFrame::new("a", frame(&[0.0], 1))).unwrap().is_none());
        assert_eq!(t.frame_id(), 1);
        assert_eq!(t.scene(), Some("a"));
        assert_eq!(t.max_id(), 0);
    }

    #[test]
    fn test_short_term_chains_ids() {
        let mut t = tracker(AssociationMode::ShortTerm);
        t.update(SceneFrame::new("a", frame(&[0.0, 5.0], 1))).unwrap();
        let first = t.update(SceneFrame::new("a", frame(&[0.2, 5.1], 1))).unwrap().unwrap();
        let second = t.update(SceneFrame::new("a", frame(&[5.3, 0.4], 1))).unwrap().unwrap();

        assert_eq!(first.ids_t2, array![1, 2]);
        assert_eq!(second.ids_t1, first.ids_t2);
        assert_eq!(second.ids_t2, array![2, 1]);
        assert_eq!(t.max_id(), 2);
        assert!(t.cache().is_none());
    }

    #[test]
    fn test_scene_change_resets() {
        for mode in [AssociationMode::ShortTerm, AssociationMode::LongTerm] {
            let mut t = tracker(mode);
            t.update(SceneFrame::new("a", frame(&[0.0], 1))).unwrap();
            t.update(SceneFrame::new("a", frame(&[10.0], 1))).unwrap();
            assert_eq!(t.max_id(), 2);

            assert!(t.update(SceneFrame::new("b", frame(&[0.0], 1))).unwrap().is_none());
            assert_eq!(t.max_id(), 0);
            let out = t.update(SceneFrame::new("b", frame(&[0.1], 1))).unwrap().unwrap();
            assert_eq!(out.ids_t2, array![1]);
            assert_eq!(t.frame_id(), 2);
        }
    }

    #[test]
    fn test_flow_travels_with_previous_frame() {
        let mut t = tracker(AssociationMode::ShortTerm);
        t.update(SceneFrame::new("a", frame(&[0.0], 1)).with_flow(array![[3.0, 0.0, 0.0]]))
            .unwrap();
        let out = t.update(SceneFrame::new("a", frame(&[3.1], 1))).unwrap().unwrap();
        assert_eq!(out.ids_t1, out.ids_t2);
    }

    #[test]
    fn test_rejected_frame_keeps_state() {
        let mut t = tracker(AssociationMode::LongTerm);
        // Flow with the wrong width for frame t.
        t.update(SceneFrame::new("a", frame(&[0.0], 1)).with_flow(Array2::zeros((1, 2))))
            .unwrap();
        assert!(t.update(SceneFrame::new("a", frame(&[0.1], 1))).is_err());
        assert_eq!(t.frame_id(), 1);
        assert_eq!(t.cache().map(ObjectCache::len), Some(0));
        assert_eq!(t.mode(), AssociationMode::LongTerm);
    }
}
