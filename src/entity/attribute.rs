//! Optional per-body attributes and their visual state.
//!
//! Each declared attribute becomes an [`AttributeSlot`] holding per-batch
//! storage plus the update function picked for its [`AttributeKind`] when the
//! slot is created. Vector kinds keep an [`Arrow`]; contacts keep an active
//! mask over the body's point set.

use crate::math;
use crate::model::OptionalAttribute;
use crate::state::AttributeValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorAttribute {
    Velocity,
    AngularVelocity,
    Force,
    Torque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Vector(VectorAttribute),
    ContactList,
}

impl AttributeKind {
    pub fn of(attr: OptionalAttribute) -> Self {
        match attr {
            OptionalAttribute::Velocity => AttributeKind::Vector(VectorAttribute::Velocity),
            OptionalAttribute::AngularVelocity => AttributeKind::Vector(VectorAttribute::AngularVelocity),
            OptionalAttribute::Force => AttributeKind::Vector(VectorAttribute::Force),
            OptionalAttribute::Torque => AttributeKind::Vector(VectorAttribute::Torque),
            OptionalAttribute::Contacts => AttributeKind::ContactList,
        }
    }
}

/// Arrow length per unit magnitude, per vector kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowScales {
    pub velocity: f32,
    pub angular_velocity: f32,
    pub force: f32,
    pub torque: f32,
}

impl ArrowScales {
    pub fn from_config(cfg: &crate::config::ViewerConfig) -> Self {
        Self {
            velocity: cfg.velocity_scale,
            angular_velocity: cfg.angular_velocity_scale,
            force: cfg.force_scale,
            torque: cfg.torque_scale,
        }
    }

    pub fn scale(&self, kind: VectorAttribute) -> f32 {
        match kind {
            VectorAttribute::Velocity => self.velocity,
            VectorAttribute::AngularVelocity => self.angular_velocity,
            VectorAttribute::Force => self.force,
            VectorAttribute::Torque => self.torque,
        }
    }
}

impl Default for ArrowScales {
    fn default() -> Self {
        Self::from_config(&crate::config::ViewerConfig::default())
    }
}

/// Directional indicator, anchored at the body position when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Arrow {
    pub direction: [f32; 3],
    /// 0 hides the arrow.
    pub length: f32,
}

impl Arrow {
    pub const HIDDEN: Arrow = Arrow {
        direction: [0.0, 0.0, 1.0],
        length: 0.0,
    };

    pub fn from_vector(v: [f32; 3], scale: f32) -> Self {
        match math::normalize(v) {
            Some((direction, magnitude)) => Arrow {
                direction,
                length: magnitude * scale,
            },
            None => Arrow::HIDDEN,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.length > 0.0
    }

    pub fn tip(&self, origin: [f32; 3]) -> [f32; 3] {
        math::add(origin, math::scale(self.direction, self.length))
    }
}

#[derive(Debug, Clone)]
pub enum SlotState {
    Vector {
        values: Vec<[f32; 3]>,
        arrows: Vec<Arrow>,
        scale: f32,
    },
    Contacts {
        /// `active[batch][point]`
        active: Vec<Vec<bool>>,
    },
}

type UpdateFn = fn(&mut SlotState, Option<&AttributeValues>);

#[derive(Debug, Clone)]
pub struct AttributeSlot {
    attr: OptionalAttribute,
    kind: AttributeKind,
    state: SlotState,
    update: UpdateFn,
}

impl AttributeSlot {
    pub fn new(attr: OptionalAttribute, batches: usize, point_count: usize, scales: &ArrowScales) -> Self {
        let kind = AttributeKind::of(attr);
        let (state, update): (SlotState, UpdateFn) = match kind {
            AttributeKind::Vector(v) => (
                SlotState::Vector {
                    values: vec![[0.0; 3]; batches],
                    arrows: vec![Arrow::HIDDEN; batches],
                    scale: scales.scale(v),
                },
                update_vector,
            ),
            AttributeKind::ContactList => (
                SlotState::Contacts {
                    active: vec![vec![false; point_count]; batches],
                },
                update_contacts,
            ),
        };
        Self { attr, kind, state, update }
    }

    pub fn attr(&self) -> OptionalAttribute {
        self.attr
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    /// `values` is this attribute's entry in the slice, `None` when absent.
    pub fn apply(&mut self, values: Option<&AttributeValues>) {
        (self.update)(&mut self.state, values);
    }

    pub fn arrow(&self, batch: usize) -> Option<Arrow> {
        match &self.state {
            SlotState::Vector { arrows, .. } => arrows.get(batch).copied(),
            SlotState::Contacts { .. } => None,
        }
    }

    pub fn vector(&self, batch: usize) -> Option<[f32; 3]> {
        match &self.state {
            SlotState::Vector { values, .. } => values.get(batch).copied(),
            SlotState::Contacts { .. } => None,
        }
    }

    pub fn contact_mask(&self, batch: usize) -> Option<&[bool]> {
        match &self.state {
            SlotState::Contacts { active } => active.get(batch).map(Vec::as_slice),
            SlotState::Vector { .. } => None,
        }
    }
}

fn update_vector(state: &mut SlotState, incoming: Option<&AttributeValues>) {
    let (SlotState::Vector { values, arrows, scale }, Some(AttributeValues::Vectors(rows))) = (state, incoming) else {
        return;
    };
    let n = values.len().min(rows.len());
    for batch in 0..n {
        if let Some(v) = rows[batch] {
            values[batch] = v;
            arrows[batch] = Arrow::from_vector(v, *scale);
        }
    }
}

fn update_contacts(state: &mut SlotState, incoming: Option<&AttributeValues>) {
    let SlotState::Contacts { active } = state else {
        return;
    };
    for mask in active.iter_mut() {
        mask.fill(false);
    }
    let Some(AttributeValues::Contacts(lists)) = incoming else {
        return;
    };
    for (mask, indices) in active.iter_mut().zip(lists) {
        for &i in indices {
            // out-of-range indices are ignored
            if let Some(slot) = mask.get_mut(i) {
                *slot = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::math::VECTOR_EPSILON;

    #[test]
    fn tiny_vectors_hide_the_arrow() {
        let a = Arrow::from_vector([1e-7, 0.0, 0.0], 1.0);
        assert!(!a.is_visible());
        assert_eq!(a.length, 0.0);
        assert!(VECTOR_EPSILON > 1e-7);
    }

    #[test]
    fn arrow_length_is_scaled_magnitude() {
        let a = Arrow::from_vector([0.0, 3.0, 4.0], 0.5);
        assert_relative_eq!(a.length, 2.5);
        assert_relative_eq!(a.direction[1], 0.6);
        assert_eq!(a.tip([1.0, 0.0, 0.0])[0], 1.0);
    }

    #[test]
    fn vector_update_respects_batch_bounds() {
        let mut slot = AttributeSlot::new(OptionalAttribute::Force, 2, 0, &ArrowScales::default());
        let rows = AttributeValues::Vectors(vec![Some([10.0, 0.0, 0.0]), None, Some([1.0, 1.0, 1.0])]);
        slot.apply(Some(&rows));
        assert_eq!(slot.vector(0), Some([10.0, 0.0, 0.0]));
        assert_eq!(slot.vector(1), Some([0.0; 3]));
        assert!(slot.arrow(0).unwrap().is_visible());
        assert!(!slot.arrow(1).unwrap().is_visible());
        assert_eq!(slot.vector(2), None);
    }

    #[test]
    fn absent_vector_keeps_last_value() {
        let mut slot = AttributeSlot::new(OptionalAttribute::Velocity, 1, 0, &ArrowScales::default());
        slot.apply(Some(&AttributeValues::Vectors(vec![Some([1.0, 0.0, 0.0])])));
        slot.apply(None);
        assert_eq!(slot.vector(0), Some([1.0, 0.0, 0.0]));
    }

    #[test]
    fn contacts_mark_points_and_ignore_bad_indices() {
        let mut slot = AttributeSlot::new(OptionalAttribute::Contacts, 2, 4, &ArrowScales::default());
        slot.apply(Some(&AttributeValues::Contacts(vec![vec![0, 3, 99]])));
        assert_eq!(slot.contact_mask(0).unwrap(), &[true, false, false, true]);
        assert_eq!(slot.contact_mask(1).unwrap(), &[false; 4]);

        // absent list clears everything
        slot.apply(None);
        assert_eq!(slot.contact_mask(0).unwrap(), &[false; 4]);
    }
}
