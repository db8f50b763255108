//! Scene entities and their batched state.
//!
//! - `body`: dynamic bodies: per-batch pose + optional attributes
//! - `attribute`: attribute slots, arrows and contact masks
//! - `terrain`: shared or per-batch height grid
//! - `static_object`: fixed geometry, singleton or batched

pub mod attribute;
pub mod body;
pub mod static_object;
pub mod terrain;

use crate::model::Model;
use crate::state::{Snapshot, Timeline};

pub use attribute::{Arrow, ArrowScales, AttributeKind, AttributeSlot, VectorAttribute};
pub use body::Body;
pub use static_object::StaticObject;
pub use terrain::Terrain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Body,
    Terrain,
    StaticObject,
}

/// Anything placed in the scene. Only bodies react to state slices.
pub trait SceneEntity {
    fn name(&self) -> &str;
    fn kind(&self) -> EntityKind;
    fn batch_count(&self) -> usize;
    /// Pull this entity's slice out of `snapshot` and apply it.
    fn update_state(&mut self, snapshot: &Snapshot);
}

/// All entities built from one model.
#[derive(Debug, Clone)]
pub struct Scene {
    pub terrain: Terrain,
    pub bodies: Vec<Body>,
    pub static_objects: Vec<StaticObject>,
    sim_batches: usize,
}

impl Scene {
    pub fn from_model(model: &Model, scales: ArrowScales) -> Self {
        let n = model.sim_batches;
        Scene {
            terrain: Terrain::new(&model.terrain, n),
            bodies: model.bodies.iter().map(|b| Body::new(b, n, scales)).collect(),
            static_objects: model
                .static_objects
                .iter()
                .map(|s| StaticObject::new(s, n))
                .collect(),
            sim_batches: n,
        }
    }

    pub fn sim_batches(&self) -> usize {
        self.sim_batches
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut dyn SceneEntity> + '_ {
        std::iter::once(&mut self.terrain as &mut dyn SceneEntity)
            .chain(self.bodies.iter_mut().map(|b| b as &mut dyn SceneEntity))
            .chain(self.static_objects.iter_mut().map(|s| s as &mut dyn SceneEntity))
    }

    pub fn update_state(&mut self, snapshot: &Snapshot) {
        for entity in self.entities_mut() {
            entity.update_state(snapshot);
        }
    }

    /// Bodies without a declared attribute set take the union observed in
    /// `timeline`. Bodies that already have a set keep it.
    pub fn freeze_attributes(&mut self, timeline: &Timeline) {
        for body in &mut self.bodies {
            if !body.attributes_frozen() {
                let observed = timeline.observed_attributes(body.name());
                body.freeze_attributes(observed);
            }
        }
    }

    pub fn body(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|b| b.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionalAttribute;
    use serde_json::json;

    fn scene() -> Scene {
        let model = Model::from_value(crate::model::tests::two_batch_model()).unwrap();
        Scene::from_model(&model, ArrowScales::default())
    }

    #[test]
    fn update_reaches_every_batch() {
        let mut scene = scene();
        let timeline = Timeline::from_value(
            crate::state::tests::two_batch_states(),
            None,
            &["energy".to_string()],
            0.01,
        )
        .unwrap();
        scene.update_state(timeline.get(10).unwrap());
        let body = scene.body("Box").unwrap();
        assert!((body.pose(0).unwrap().position[2] - 1.5).abs() < 1e-5);
        assert_eq!(body.pose(1).unwrap().position, [2.0, 0.0, 1.0]);
    }

    #[test]
    fn attribute_set_is_inferred_once() {
        let mut scene = scene();
        let first = Timeline::from_value(
            json!([
                {"time": 0.0, "bodies": [{"name": "Box", "position": [0, 0, 0], "force": [[0, 0, 1]]}]},
                {"time": 0.1, "bodies": [{"name": "Box", "position": [0, 0, 0], "velocity": [[1, 0, 0]]}]}
            ]),
            None,
            &[],
            0.01,
        )
        .unwrap();
        scene.freeze_attributes(&first);
        let body = scene.body("Box").unwrap();
        assert_eq!(
            body.attribute_set(),
            vec![OptionalAttribute::Velocity, OptionalAttribute::Force]
        );

        let second = Timeline::from_value(
            json!([{"time": 0.0, "bodies": [{"name": "Box", "position": [0, 0, 0], "contacts": [[0]]}]}]),
            None,
            &[],
            0.01,
        )
        .unwrap();
        scene.freeze_attributes(&second);
        scene.update_state(second.get(0).unwrap());
        let body = scene.body("Box").unwrap();
        assert!(!body.has_attribute(OptionalAttribute::Contacts));
        assert!(body.active_contacts(0).is_empty());
    }

    #[test]
    fn unknown_bodies_in_a_snapshot_are_ignored() {
        let mut scene = scene();
        let t = Timeline::from_value(
            json!([{"time": 0.0, "bodies": [{"name": "Nope", "position": [9, 9, 9]}]}]),
            None,
            &[],
            0.01,
        )
        .unwrap();
        scene.update_state(t.get(0).unwrap());
        assert_eq!(scene.body("Box").unwrap().pose(0).unwrap().position, [0.0; 3]);
    }
}
