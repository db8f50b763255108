use crate::math::Pose;
use crate::model::{Shape, StaticObjectSpec, StaticShapes};
use crate::state::Snapshot;

use super::{EntityKind, SceneEntity};

/// Fixed geometry: one shape shared by all batches, or one per batch.
#[derive(Debug, Clone)]
pub struct StaticObject {
    name: String,
    shapes: StaticShapes,
    pose: Pose,
    sim_batches: usize,
}

impl StaticObject {
    pub fn new(spec: &StaticObjectSpec, sim_batches: usize) -> Self {
        Self {
            name: spec.name.clone(),
            shapes: spec.shapes.clone(),
            pose: spec.pose,
            sim_batches,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self.shapes, StaticShapes::Singleton(_))
    }

    pub fn shape_for(&self, batch: usize) -> Option<&Shape> {
        if batch >= self.sim_batches {
            return None;
        }
        match &self.shapes {
            StaticShapes::Singleton(s) => Some(s),
            StaticShapes::Batched(list) => list.get(batch),
        }
    }
}

impl SceneEntity for StaticObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::StaticObject
    }

    fn batch_count(&self) -> usize {
        self.sim_batches
    }

    fn update_state(&mut self, _snapshot: &Snapshot) {}
}
