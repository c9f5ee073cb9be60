//! Session-owned track table.

use std::collections::BTreeMap;

use crate::error::{AssocError, Result};
use crate::tracker::frame::{BACKGROUND_ID, ClassId, InstanceId};
use crate::tracker::instance::{IdAllocator, Instance};

/// Live instances partitioned by semantic class, plus the global id counter.
///
/// Partitions are ordered maps so that snapshots, and therefore cost matrix
/// rows, come out in ascending id order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCache {
    classes: BTreeMap<ClassId, BTreeMap<InstanceId, Instance>>,
    ids: IdAllocator,
    max_life: i32,
}

impl ObjectCache {
    pub fn new(max_life: i32) -> Self {
        Self {
            classes: BTreeMap::new(),
            ids: IdAllocator::default(),
            max_life,
        }
    }

    pub fn max_life(&self) -> i32 {
        self.max_life
    }

    /// Highest id ever issued in this session.
    pub fn max_id(&self) -> InstanceId {
        self.ids.max_id()
    }

    /// Issue a fresh id, advancing `max_id`.
    pub fn mint_id(&mut self) -> InstanceId {
        self.ids.mint()
    }

    /// Age every live instance by one step and drop the expired ones.
    ///
    /// Returns the evicted `(class, id)` pairs.
    pub fn update_step(&mut self) -> Vec<(ClassId, InstanceId)> {
        let mut evicted = Vec::new();
        for (&class_id, instances) in self.classes.iter_mut() {
            instances.retain(|&id, inst| {
                inst.decay();
                if inst.is_expired() {
                    evicted.push((class_id, id));
                    false
                } else {
                    true
                }
            });
        }
        self.classes.retain(|_, instances| !instances.is_empty());

        if !evicted.is_empty() {
            log::debug!("Evicted {} instances: {:?}", evicted.len(), evicted);
        }
        evicted
    }

    /// Insert or overwrite `instance` with a full life budget.
    pub fn add_instance(&mut self, class_id: ClassId, instance: Instance) -> Result<()> {
        self.insert(class_id, instance, self.max_life)
    }

    /// Insert an instance observed one step before the current pair; it starts
    /// one life short of the budget.
    pub fn seed_instance(&mut self, class_id: ClassId, instance: Instance) -> Result<()> {
        self.insert(class_id, instance, self.max_life - 1)
    }

    fn insert(&mut self, class_id: ClassId, mut instance: Instance, life: i32) -> Result<()> {
        if instance.id == BACKGROUND_ID {
            return Err(AssocError::InvariantViolation {
                class_id,
                cluster_id: None,
                ids: vec![instance.id],
                reason: "background id cannot own an instance",
            });
        }
        if let Some(owner) = self.owner_class(instance.id) {
            if owner != class_id {
                return Err(AssocError::InvariantViolation {
                    class_id,
                    cluster_id: None,
                    ids: vec![instance.id],
                    reason: "id is still alive in another class partition",
                });
            }
        }

        instance.class_id = class_id;
        instance.life = life;
        self.ids.observe(instance.id);
        self.classes
            .entry(class_id)
            .or_default()
            .insert(instance.id, instance);
        Ok(())
    }

    /// Copy of the live instances of one class.
    pub fn snapshot(&self, class_id: ClassId) -> BTreeMap<InstanceId, Instance> {
        self.classes.get(&class_id).cloned().unwrap_or_default()
    }

    pub fn instances(&self, class_id: ClassId) -> impl Iterator<Item = &Instance> {
        self.classes.get(&class_id).into_iter().flat_map(|m| m.values())
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.classes.values().find_map(|m| m.get(&id))
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.classes.values_mut().find_map(|m| m.get_mut(&id))
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    fn owner_class(&self, id: InstanceId) -> Option<ClassId> {
        self.classes
            .iter()
            .find(|(_, m)| m.contains_key(&id))
            .map(|(&c, _)| c)
    }

    /// Zero an instance's life so the next [`update_step`](Self::update_step)
    /// evicts it. Returns whether the instance was found.
    pub fn mark_for_eviction(&mut self, id: InstanceId) -> bool {
        match self.get_mut(id) {
            Some(inst) => {
                inst.life = inst.life.min(0);
                true
            }
            None => false,
        }
    }

    pub fn class_len(&self, class_id: ClassId) -> usize {
        self.classes.get(&class_id).map_or(0, |m| m.len())
    }

    pub fn len(&self) -> usize {
        self.classes.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Drop every live instance. The id counter restarts unless `keep_max_id`.
    pub fn clear(&mut self, keep_max_id: bool) {
        self.classes.clear();
        if !keep_max_id {
            self.ids = IdAllocator::default();
        }
    }
}
