//! Time-series state: wire payloads and the normalized [`Timeline`].
//!
//! Every pose and attribute shape the recorders have produced is folded into
//! one per-batch representation here, so entities only ever see
//! [`BodySlice`] values indexed by batch.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SimviewError};
use crate::math::{Pose, Quat};
use crate::model::{Batchable, OptionalAttribute};

// ─── Wire payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatePayload {
    pub time: f64,
    #[serde(default)]
    pub bodies: Vec<BodyStatePayload>,
    /// Scalars live at the snapshot's top level, keyed by name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyStatePayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_transform: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angular_velocity: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torque: Option<Batchable<f32>>,
    /// `[vx, vy, vz, wx, wy, wz]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_velocity: Option<Batchable<f32>>,
    /// `[fx, fy, fz, tx, ty, tz]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_force: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Batchable<i64>>,
}

// ─── Normalized form ─────────────────────────────────────────────────────────

/// Per-batch values of one optional attribute at one time index.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    /// `None` where the row had the wrong arity.
    Vectors(Vec<Option<[f32; 3]>>),
    Contacts(Vec<Vec<usize>>),
}

/// Everything one body receives at one time index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodySlice {
    /// Indexed by batch; `None` rows leave that batch's pose untouched.
    pub poses: Vec<Option<Pose>>,
    pub attributes: BTreeMap<OptionalAttribute, AttributeValues>,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub time: f64,
    pub bodies: HashMap<String, BodySlice>,
    /// Per-batch scalar values (a single wire float becomes a one-element list).
    pub scalars: HashMap<String, Vec<f32>>,
}

impl Snapshot {
    pub fn body(&self, name: &str) -> Option<&BodySlice> {
        self.bodies.get(name)
    }

    pub fn scalar(&self, name: &str, batch: usize) -> Option<f32> {
        let values = self.scalars.get(name)?;
        match values.as_slice() {
            [single] => Some(*single),
            many => many.get(batch).copied(),
        }
    }
}

/// Fold the three historical pose encodings into per-batch poses.
///
/// `bodyTransform` wins over `position`/`orientation` when both are present.
/// A flat (non-batched) array only addresses batch 0.
pub fn normalize_pose(
    transform: Option<&Batchable<f32>>,
    position: Option<&Batchable<f32>>,
    orientation: Option<&Batchable<f32>>,
) -> Vec<Option<Pose>> {
    if let Some(t) = transform {
        return t.layers().into_iter().map(Pose::from_transform).collect();
    }
    let Some(position) = position else {
        return Vec::new();
    };
    let positions = position.layers();
    let orientations = orientation.map(Batchable::layers).unwrap_or_default();

    positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let [x, y, z] = <[f32; 3]>::try_from(*p).ok()?;
            let orientation = match orientations.get(i) {
                None => Quat::IDENTITY,
                Some(q) => Quat::from_wxyz(<[f32; 4]>::try_from(*q).ok()?),
            };
            Some(Pose {
                position: [x, y, z],
                orientation,
            })
        })
        .collect()
}

fn vectors(field: &Batchable<f32>, range: std::ops::Range<usize>, width: usize) -> Vec<Option<[f32; 3]>> {
    field
        .layers()
        .into_iter()
        .map(|row| {
            if row.len() != width {
                return None;
            }
            <[f32; 3]>::try_from(&row[range.clone()]).ok()
        })
        .collect()
}

fn contact_lists(field: &Batchable<i64>) -> Vec<Vec<usize>> {
    field
        .layers()
        .into_iter()
        .map(|row| row.iter().filter_map(|&i| usize::try_from(i).ok()).collect())
        .collect()
}

impl BodySlice {
    pub fn from_payload(b: &BodyStatePayload) -> Self {
        let poses = normalize_pose(
            b.body_transform.as_ref(),
            b.position.as_ref(),
            b.orientation.as_ref(),
        );

        let mut attributes = BTreeMap::new();
        let mut put_vec = |attr: OptionalAttribute, field: Option<&Batchable<f32>>, range, width| {
            if let Some(f) = field {
                attributes
                    .entry(attr)
                    .or_insert_with(|| AttributeValues::Vectors(vectors(f, range, width)));
            }
        };
        // Explicit fields are inserted first so they win over the 6-tuple aliases.
        put_vec(OptionalAttribute::Velocity, b.velocity.as_ref(), 0..3, 3);
        put_vec(OptionalAttribute::AngularVelocity, b.angular_velocity.as_ref(), 0..3, 3);
        put_vec(OptionalAttribute::Force, b.force.as_ref(), 0..3, 3);
        put_vec(OptionalAttribute::Torque, b.torque.as_ref(), 0..3, 3);
        put_vec(OptionalAttribute::Velocity, b.body_velocity.as_ref(), 0..3, 6);
        put_vec(OptionalAttribute::AngularVelocity, b.body_velocity.as_ref(), 3..6, 6);
        put_vec(OptionalAttribute::Force, b.body_force.as_ref(), 0..3, 6);
        put_vec(OptionalAttribute::Torque, b.body_force.as_ref(), 3..6, 6);

        if let Some(c) = &b.contacts {
            attributes.insert(
                OptionalAttribute::Contacts,
                AttributeValues::Contacts(contact_lists(c)),
            );
        }

        BodySlice { poses, attributes }
    }

    pub fn attribute(&self, attr: OptionalAttribute) -> Option<&AttributeValues> {
        self.attributes.get(&attr)
    }
}

fn scalar_values(v: &Value) -> Option<Vec<f32>> {
    match v {
        Value::Number(n) => n.as_f64().map(|f| vec![f as f32]),
        Value::Array(items) => items
            .iter()
            .map(|x| x.as_f64().map(|f| f as f32))
            .collect(),
        _ => None,
    }
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Timeline {
    snapshots: Vec<Snapshot>,
    timestep: f64,
}

impl Timeline {
    pub fn from_json(
        text: &str,
        model_dt: Option<f64>,
        scalar_names: &[String],
        default_timestep: f64,
    ) -> Result<Self> {
        let payloads: Vec<StatePayload> = serde_json::from_str(text)?;
        Self::from_payloads(payloads, model_dt, scalar_names, default_timestep)
    }

    pub fn from_value(
        value: Value,
        model_dt: Option<f64>,
        scalar_names: &[String],
        default_timestep: f64,
    ) -> Result<Self> {
        let payloads: Vec<StatePayload> = serde_json::from_value(value)?;
        Self::from_payloads(payloads, model_dt, scalar_names, default_timestep)
    }

    pub fn from_payloads(
        payloads: Vec<StatePayload>,
        model_dt: Option<f64>,
        scalar_names: &[String],
        default_timestep: f64,
    ) -> Result<Self> {
        if payloads.is_empty() {
            return Err(SimviewError::EmptyStates);
        }

        let mut snapshots = Vec::with_capacity(payloads.len());
        for (i, p) in payloads.into_iter().enumerate() {
            let mut scalars = HashMap::with_capacity(scalar_names.len());
            for name in scalar_names {
                let values = p.extra.get(name).and_then(scalar_values).ok_or_else(|| {
                    SimviewError::MissingScalar {
                        state: i,
                        name: name.clone(),
                    }
                })?;
                scalars.insert(name.clone(), values);
            }
            let bodies = p
                .bodies
                .iter()
                .map(|b| (b.name.clone(), BodySlice::from_payload(b)))
                .collect();
            snapshots.push(Snapshot {
                time: p.time,
                bodies,
                scalars,
            });
        }

        let timestep = infer_timestep(&snapshots, model_dt, default_timestep);
        log::info!(
            "Timeline: {} states, dt={}, total={:.3}s",
            snapshots.len(),
            timestep,
            snapshots.last().map_or(0.0, |s| s.time)
        );
        Ok(Timeline { snapshots, timestep })
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn total_time(&self) -> f64 {
        self.snapshots.last().map_or(0.0, |s| s.time.max(0.0))
    }

    /// Union of optional attributes a body carries anywhere in the recording.
    pub fn observed_attributes(&self, body: &str) -> BTreeSet<OptionalAttribute> {
        self.snapshots
            .iter()
            .filter_map(|s| s.body(body))
            .flat_map(|b| b.attributes.keys().copied())
            .collect()
    }

    /// `(time, value)` pairs of one scalar for one batch.
    pub fn scalar_series(&self, name: &str, batch: usize) -> Vec<(f64, f32)> {
        self.snapshots
            .iter()
            .filter_map(|s| s.scalar(name, batch).map(|v| (s.time, v)))
            .collect()
    }
}

fn infer_timestep(snapshots: &[Snapshot], model_dt: Option<f64>, default_timestep: f64) -> f64 {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if let Some(dt) = model_dt.filter(|d| positive(*d)) {
        return dt;
    }
    if let [first, second, ..] = snapshots {
        let dt = second.time - first.time;
        if positive(dt) {
            return dt;
        }
    }
    if positive(default_timestep) {
        default_timestep
    } else {
        0.01
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// 50 states at dt=0.1 for the two-batch box model.
    pub(crate) fn two_batch_states() -> Value {
        let states: Vec<Value> = (0..50)
            .map(|t| {
                let time = t as f64 * 0.1;
                json!({
                    "time": time,
                    "bodies": [{
                        "name": "Box",
                        "bodyTransform": [
                            [0.0, 0.0, time * 0.5 + 1.0, 1.0, 0.0, 0.0, 0.0],
                            [2.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]
                        ]
                    }],
                    "energy": [10.0 - t as f64 * 0.1, 5.0]
                })
            })
            .collect();
        Value::Array(states)
    }

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn three_pose_encodings_agree() {
        let transform = Batchable::Batched(vec![vec![1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0]]);
        let position = Batchable::Batched(vec![vec![1.0, 2.0, 3.0]]);
        let orientation = Batchable::Batched(vec![vec![1.0, 0.0, 0.0, 0.0]]);
        let flat = Batchable::Flat(vec![1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0]);

        let a = normalize_pose(Some(&transform), None, None);
        let b = normalize_pose(None, Some(&position), Some(&orientation));
        let c = normalize_pose(Some(&flat), None, None);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a[0].unwrap().position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn wrong_arity_rows_are_skipped() {
        let t = Batchable::Batched(vec![vec![0.0; 7], vec![0.0; 5]]);
        let poses = normalize_pose(Some(&t), None, None);
        assert_eq!(poses.len(), 2);
        assert!(poses[0].is_some());
        assert!(poses[1].is_none());
    }

    #[test]
    fn body_velocity_alias_splits_into_two_attributes() {
        let b: BodyStatePayload = serde_json::from_value(json!({
            "name": "A",
            "bodyVelocity": [[1, 2, 3, 4, 5, 6]],
            "angularVelocity": [[9, 9, 9]]
        }))
        .unwrap();
        let s = BodySlice::from_payload(&b);
        assert_eq!(
            s.attribute(OptionalAttribute::Velocity),
            Some(&AttributeValues::Vectors(vec![Some([1.0, 2.0, 3.0])]))
        );
        // explicit field beats the alias
        assert_eq!(
            s.attribute(OptionalAttribute::AngularVelocity),
            Some(&AttributeValues::Vectors(vec![Some([9.0, 9.0, 9.0])]))
        );
    }

    #[test]
    fn timestep_prefers_model_dt_then_state_times() {
        let states = two_batch_states();
        let t = Timeline::from_value(states.clone(), Some(0.2), &names(&["energy"]), 0.01).unwrap();
        assert_eq!(t.timestep(), 0.2);
        let t = Timeline::from_value(states, None, &names(&["energy"]), 0.01).unwrap();
        assert!((t.timestep() - 0.1).abs() < 1e-9);
        assert!((t.total_time() - 4.9).abs() < 1e-9);
    }

    #[test]
    fn single_state_falls_back_to_default_timestep() {
        let t = Timeline::from_value(json!([{"time": 0.0, "bodies": []}]), None, &[], 0.02).unwrap();
        assert_eq!(t.timestep(), 0.02);
        let t = Timeline::from_value(json!([{"time": 0.0}, {"time": 0.0}]), None, &[], -1.0).unwrap();
        assert_eq!(t.timestep(), 0.01);
    }

    #[test]
    fn missing_scalar_names_the_state() {
        let mut states = two_batch_states();
        states[3].as_object_mut().unwrap().remove("energy");
        match Timeline::from_value(states, None, &names(&["energy"]), 0.01) {
            Err(SimviewError::MissingScalar { state, name }) => {
                assert_eq!(state, 3);
                assert_eq!(name, "energy");
            }
            other => panic!("unexpected {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn empty_states_are_rejected() {
        assert!(matches!(
            Timeline::from_value(json!([]), None, &[], 0.01),
            Err(SimviewError::EmptyStates)
        ));
    }

    #[test]
    fn scalar_series_per_batch() {
        let t = Timeline::from_value(two_batch_states(), None, &names(&["energy"]), 0.01).unwrap();
        let s0 = t.scalar_series("energy", 0);
        let s1 = t.scalar_series("energy", 1);
        assert_eq!(s0.len(), 50);
        assert_eq!(s0[0].1, 10.0);
        assert_eq!(s1[10].1, 5.0);
    }

    #[test]
    fn observed_attributes_are_a_union() {
        let t = Timeline::from_value(
            json!([
                {"time": 0.0, "bodies": [{"name": "A", "position": [0, 0, 0], "force": [[1, 0, 0]]}]},
                {"time": 0.1, "bodies": [{"name": "A", "position": [0, 0, 0], "contacts": [[0, 1]]}]}
            ]),
            None,
            &[],
            0.01,
        )
        .unwrap();
        let attrs = t.observed_attributes("A");
        assert!(attrs.contains(&OptionalAttribute::Force));
        assert!(attrs.contains(&OptionalAttribute::Contacts));
        assert!(!attrs.contains(&OptionalAttribute::Velocity));
    }
}
