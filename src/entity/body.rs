use std::collections::BTreeSet;

use crate::math::Pose;
use crate::model::{BodySpec, OptionalAttribute, Shape};
use crate::state::{BodySlice, Snapshot};

use super::attribute::{Arrow, ArrowScales, AttributeSlot};
use super::{EntityKind, SceneEntity};

/// A dynamic body, replicated across every batch.
#[derive(Debug, Clone)]
pub struct Body {
    name: String,
    shape: Shape,
    points: Vec<[f32; 3]>,
    poses: Vec<Pose>,
    slots: Vec<AttributeSlot>,
    /// Set once the attribute set is known; later requests are ignored.
    frozen: bool,
    scales: ArrowScales,
}

impl Body {
    pub fn new(spec: &BodySpec, sim_batches: usize, scales: ArrowScales) -> Self {
        let poses = (0..sim_batches)
            .map(|b| {
                spec.initial_poses
                    .get(b)
                    .or_else(|| spec.initial_poses.first())
                    .copied()
                    .unwrap_or(Pose::IDENTITY)
            })
            .collect();

        let mut body = Body {
            name: spec.name.clone(),
            shape: spec.shape.clone(),
            points: spec.points.clone(),
            poses,
            slots: Vec::new(),
            frozen: false,
            scales,
        };
        if let Some(declared) = &spec.declared_attributes {
            body.freeze_attributes(declared.iter().copied());
        }
        body
    }

    /// Fix the optional attribute set. Only the first call has any effect.
    pub fn freeze_attributes(&mut self, attrs: impl IntoIterator<Item = OptionalAttribute>) {
        if self.frozen {
            return;
        }
        let set: BTreeSet<OptionalAttribute> = attrs.into_iter().collect();
        let batches = self.poses.len();
        self.slots = set
            .into_iter()
            .map(|a| AttributeSlot::new(a, batches, self.points.len(), &self.scales))
            .collect();
        self.frozen = true;
        log::debug!(
            "Body '{}' attributes: [{}]",
            self.name,
            self.slots
                .iter()
                .map(|s| s.attr().wire_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    pub fn attributes_frozen(&self) -> bool {
        self.frozen
    }

    pub fn apply_slice(&mut self, slice: &BodySlice) {
        let n = self.poses.len().min(slice.poses.len());
        for batch in 0..n {
            if let Some(pose) = slice.poses[batch] {
                self.poses[batch] = pose;
            }
        }
        for slot in &mut self.slots {
            slot.apply(slice.attribute(slot.attr()));
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    pub fn pose(&self, batch: usize) -> Option<Pose> {
        self.poses.get(batch).copied()
    }

    pub fn attribute_set(&self) -> Vec<OptionalAttribute> {
        self.slots.iter().map(AttributeSlot::attr).collect()
    }

    pub fn has_attribute(&self, attr: OptionalAttribute) -> bool {
        self.slots.iter().any(|s| s.attr() == attr)
    }

    pub fn slot(&self, attr: OptionalAttribute) -> Option<&AttributeSlot> {
        self.slots.iter().find(|s| s.attr() == attr)
    }

    pub fn slots(&self) -> &[AttributeSlot] {
        &self.slots
    }

    pub fn arrow(&self, attr: OptionalAttribute, batch: usize) -> Option<Arrow> {
        self.slot(attr)?.arrow(batch)
    }

    pub fn vector(&self, attr: OptionalAttribute, batch: usize) -> Option<[f32; 3]> {
        self.slot(attr)?.vector(batch)
    }

    /// Indices of active contact points for one batch.
    pub fn active_contacts(&self, batch: usize) -> Vec<usize> {
        self.slot(OptionalAttribute::Contacts)
            .and_then(|s| s.contact_mask(batch))
            .map(|mask| {
                mask.iter()
                    .enumerate()
                    .filter_map(|(i, on)| on.then_some(i))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl SceneEntity for Body {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Body
    }

    fn batch_count(&self) -> usize {
        self.poses.len()
    }

    fn update_state(&mut self, snapshot: &Snapshot) {
        if let Some(slice) = snapshot.body(&self.name) {
            self.apply_slice(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;
    use crate::state::AttributeValues;

    fn spec(declared: Option<Vec<OptionalAttribute>>) -> BodySpec {
        let shape = Shape::Box { hx: 0.5, hy: 0.5, hz: 0.5 };
        BodySpec {
            name: "Box".into(),
            points: shape.contact_points(),
            shape,
            initial_poses: vec![Pose::IDENTITY],
            declared_attributes: declared,
        }
    }

    fn slice_with_contacts() -> BodySlice {
        let mut s = BodySlice {
            poses: vec![Some(Pose {
                position: [0.0, 0.0, 1.0],
                orientation: Quat::IDENTITY,
            })],
            ..Default::default()
        };
        s.attributes.insert(
            OptionalAttribute::Contacts,
            AttributeValues::Contacts(vec![vec![1, 2]]),
        );
        s.attributes.insert(
            OptionalAttribute::Force,
            AttributeValues::Vectors(vec![Some([0.0, 0.0, 9.81])]),
        );
        s
    }

    #[test]
    fn undeclared_contacts_are_ignored() {
        let mut body = Body::new(&spec(Some(vec![OptionalAttribute::Force])), 2, ArrowScales::default());
        body.apply_slice(&slice_with_contacts());
        assert!(!body.has_attribute(OptionalAttribute::Contacts));
        assert!(body.active_contacts(0).is_empty());
        assert!(body.arrow(OptionalAttribute::Force, 0).unwrap().is_visible());
    }

    #[test]
    fn declared_set_cannot_be_replaced() {
        let mut body = Body::new(&spec(Some(vec![OptionalAttribute::Force])), 1, ArrowScales::default());
        body.freeze_attributes([OptionalAttribute::Contacts]);
        assert_eq!(body.attribute_set(), vec![OptionalAttribute::Force]);
    }

    #[test]
    fn inferred_contacts_activate_points() {
        let mut body = Body::new(&spec(None), 2, ArrowScales::default());
        assert!(!body.attributes_frozen());
        body.freeze_attributes([OptionalAttribute::Contacts]);
        body.apply_slice(&slice_with_contacts());
        assert_eq!(body.active_contacts(0), vec![1, 2]);
        assert!(body.active_contacts(1).is_empty());
        assert_eq!(body.arrow(OptionalAttribute::Force, 0), None);
    }

    #[test]
    fn identity_orientation_keeps_the_shape_axis_aligned() {
        let mut body = Body::new(&spec(None), 2, ArrowScales::default());
        let slice = BodySlice {
            poses: vec![
                Pose::from_transform(&[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
                Pose::from_transform(&[2.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
            ],
            ..Default::default()
        };
        body.apply_slice(&slice);
        let p0 = body.pose(0).unwrap();
        assert_eq!(p0.position, [0.0, 0.0, 1.0]);
        assert_eq!(p0.orientation, Quat::IDENTITY);
        assert_eq!(p0.apply([0.5, 0.5, 0.5]), [0.5, 0.5, 1.5]);
        assert_eq!(body.pose(1).unwrap().position, [2.0, 0.0, 1.0]);
    }

    #[test]
    fn extra_batches_in_the_slice_are_ignored() {
        let mut body = Body::new(&spec(None), 1, ArrowScales::default());
        let slice = BodySlice {
            poses: vec![None, Some(Pose::IDENTITY), Some(Pose::IDENTITY)],
            ..Default::default()
        };
        body.apply_slice(&slice);
        assert_eq!(body.batch_count(), 1);
        assert_eq!(body.pose(0), Some(Pose::IDENTITY));
    }
}
