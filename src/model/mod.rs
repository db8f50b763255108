//! Static scene description: terrain, bodies and static objects.
//!
//! [`ModelPayload`] mirrors the camelCase wire JSON one-to-one (and is what the
//! scene builder writes). [`Model::from_payload`] validates it and resolves
//! shapes, poses and contact point sets so that entity construction cannot
//! fail halfway through.

pub mod shape;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SimviewError};
use crate::math::Pose;

pub use shape::Shape;

// ─── Wire payloads ───────────────────────────────────────────────────────────

/// A list given either once for every batch, or once per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Batchable<T> {
    Batched(Vec<Vec<T>>),
    Flat(Vec<T>),
}

impl<T> Batchable<T> {
    pub fn layers(&self) -> Vec<&[T]> {
        match self {
            Batchable::Batched(v) => v.iter().map(Vec::as_slice).collect(),
            Batchable::Flat(v) => vec![v.as_slice()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPayload {
    pub sim_batches: usize,
    #[serde(default)]
    pub scalar_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<f64>,
    #[serde(default)]
    pub collapse: bool,
    #[serde(default)]
    pub terrain: Option<TerrainPayload>,
    #[serde(default)]
    pub bodies: Vec<BodyPayload>,
    #[serde(default)]
    pub static_objects: Vec<StaticObjectPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainPayload {
    pub dimensions: Dimensions,
    #[serde(default)]
    pub bounds: Bounds,
    pub height_data: Batchable<f32>,
    pub normals: Batchable<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_singleton: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub size_x: f32,
    pub size_y: f32,
    pub resolution_x: usize,
    pub resolution_y: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub min_z: f32,
    pub max_z: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPayload {
    pub name: String,
    #[serde(default)]
    pub shape: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_transform: Option<Batchable<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_points: Option<Vec<[f32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_attributes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticObjectPayload {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_singleton: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_transform: Option<Vec<f32>>,
}

fn default_true() -> bool {
    true
}

// ─── Optional attributes ─────────────────────────────────────────────────────

/// Per-body state that a recording may or may not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionalAttribute {
    Velocity,
    AngularVelocity,
    Force,
    Torque,
    Contacts,
}

impl OptionalAttribute {
    pub const ALL: [OptionalAttribute; 5] = [
        OptionalAttribute::Velocity,
        OptionalAttribute::AngularVelocity,
        OptionalAttribute::Force,
        OptionalAttribute::Torque,
        OptionalAttribute::Contacts,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            OptionalAttribute::Velocity => "velocity",
            OptionalAttribute::AngularVelocity => "angularVelocity",
            OptionalAttribute::Force => "force",
            OptionalAttribute::Torque => "torque",
            OptionalAttribute::Contacts => "contacts",
        }
    }
}

impl fmt::Display for OptionalAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for OptionalAttribute {
    type Err = SimviewError;

    fn from_str(s: &str) -> Result<Self> {
        OptionalAttribute::ALL
            .into_iter()
            .find(|a| a.wire_name() == s)
            .ok_or_else(|| SimviewError::malformed(format!("unknown optional attribute '{}'", s)))
    }
}

// ─── Validated model ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Model {
    pub sim_batches: usize,
    pub scalar_names: Vec<String>,
    pub dt: Option<f64>,
    pub collapse: bool,
    pub terrain: TerrainSpec,
    pub bodies: Vec<BodySpec>,
    pub static_objects: Vec<StaticObjectSpec>,
}

#[derive(Debug, Clone)]
pub struct TerrainSpec {
    pub size_x: f32,
    pub size_y: f32,
    pub resolution_x: usize,
    pub resolution_y: usize,
    pub bounds: Bounds,
    /// One layer when shared by all batches, otherwise one per batch.
    pub heights: Vec<Vec<f32>>,
    pub normals: Vec<Vec<[f32; 3]>>,
    pub singleton: bool,
}

#[derive(Debug, Clone)]
pub struct BodySpec {
    pub name: String,
    pub shape: Shape,
    /// Poses applied before any state arrives; one shared or one per batch.
    pub initial_poses: Vec<Pose>,
    /// Points that contact indices refer to.
    pub points: Vec<[f32; 3]>,
    pub declared_attributes: Option<Vec<OptionalAttribute>>,
}

#[derive(Debug, Clone)]
pub enum StaticShapes {
    Singleton(Shape),
    Batched(Vec<Shape>),
}

#[derive(Debug, Clone)]
pub struct StaticObjectSpec {
    pub name: String,
    pub shapes: StaticShapes,
    pub pose: Pose,
}

impl Model {
    pub fn from_json(text: &str) -> Result<Self> {
        let payload: ModelPayload = serde_json::from_str(text)?;
        Self::from_payload(payload)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let payload: ModelPayload = serde_json::from_value(value)?;
        Self::from_payload(payload)
    }

    pub fn from_payload(payload: ModelPayload) -> Result<Self> {
        let n = payload.sim_batches;
        if n == 0 {
            return Err(SimviewError::malformed("simBatches must be at least 1"));
        }
        let terrain = payload
            .terrain
            .as_ref()
            .ok_or_else(|| SimviewError::malformed("model has no terrain"))
            .and_then(|t| TerrainSpec::from_payload(t, n))?;

        let bodies = payload
            .bodies
            .iter()
            .map(|b| BodySpec::from_payload(b, n))
            .collect::<Result<Vec<_>>>()?;

        let static_objects = payload
            .static_objects
            .iter()
            .map(|s| StaticObjectSpec::from_payload(s, n))
            .collect::<Result<Vec<_>>>()?;

        let dt = payload.dt.filter(|dt| dt.is_finite() && *dt > 0.0);

        log::info!(
            "Model: {} batches, {} bodies, {} static objects, terrain {}x{}",
            n,
            bodies.len(),
            static_objects.len(),
            terrain.resolution_x,
            terrain.resolution_y
        );

        Ok(Model {
            sim_batches: n,
            scalar_names: payload.scalar_names,
            dt,
            collapse: payload.collapse,
            terrain,
            bodies,
            static_objects,
        })
    }
}

impl TerrainSpec {
    fn from_payload(t: &TerrainPayload, sim_batches: usize) -> Result<Self> {
        let d = t.dimensions;
        if d.resolution_x == 0 || d.resolution_y == 0 {
            return Err(SimviewError::malformed("terrain resolution must be positive"));
        }
        let cells = d.resolution_x.checked_mul(d.resolution_y).ok_or_else(|| {
            SimviewError::malformed(format!(
                "terrain resolution {}x{} is too large",
                d.resolution_x, d.resolution_y
            ))
        })?;

        let heights = t.height_data.layers();
        let normals = t.normals.layers();
        check_layer_count("heightData", heights.len(), sim_batches)?;
        check_layer_count("normals", normals.len(), sim_batches)?;

        for (i, layer) in heights.iter().enumerate() {
            if layer.len() != cells {
                return Err(SimviewError::malformed(format!(
                    "heightData[{}] has {} values, expected {}x{}={}",
                    i,
                    layer.len(),
                    d.resolution_x,
                    d.resolution_y,
                    cells
                )));
            }
        }
        for (i, layer) in normals.iter().enumerate() {
            if layer.len() != cells {
                return Err(SimviewError::malformed(format!(
                    "normals[{}] has {} values, expected {}",
                    i,
                    layer.len(),
                    cells
                )));
            }
        }

        let singleton = t
            .is_singleton
            .unwrap_or(heights.len() == 1 && normals.len() == 1);
        if !singleton && (heights.len() != sim_batches || normals.len() != sim_batches) {
            return Err(SimviewError::malformed(format!(
                "batched terrain needs {} layers, got {} heights / {} normals",
                sim_batches,
                heights.len(),
                normals.len()
            )));
        }

        let keep = if singleton { 1 } else { sim_batches };
        Ok(TerrainSpec {
            size_x: d.size_x,
            size_y: d.size_y,
            resolution_x: d.resolution_x,
            resolution_y: d.resolution_y,
            bounds: t.bounds,
            heights: heights.iter().take(keep).map(|l| l.to_vec()).collect(),
            normals: normals.iter().take(keep).map(|l| l.to_vec()).collect(),
            singleton,
        })
    }
}

fn check_layer_count(field: &str, layers: usize, sim_batches: usize) -> Result<()> {
    if layers == 1 || layers == sim_batches {
        Ok(())
    } else {
        Err(SimviewError::malformed(format!(
            "{} has {} layers for {} batches",
            field, layers, sim_batches
        )))
    }
}

impl BodySpec {
    fn from_payload(b: &BodyPayload, sim_batches: usize) -> Result<Self> {
        let shape_value = b
            .shape
            .as_ref()
            .ok_or_else(|| SimviewError::malformed(format!("body '{}' has no shape", b.name)))?;
        let shape = Shape::from_json(shape_value)
            .map_err(|e| SimviewError::malformed(format!("body '{}': {}", b.name, e)))?;

        let initial_poses = match &b.body_transform {
            None => vec![Pose::IDENTITY],
            Some(t) => {
                let layers = t.layers();
                check_layer_count("bodyTransform", layers.len(), sim_batches)?;
                layers
                    .iter()
                    .map(|row| {
                        Pose::from_transform(row).ok_or_else(|| {
                            SimviewError::malformed(format!(
                                "body '{}': bodyTransform rows need 7 values",
                                b.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let points = match &b.body_points {
            Some(p) => p.clone(),
            None => shape.contact_points(),
        };

        let declared_attributes = b
            .available_attributes
            .as_ref()
            .map(|names| {
                let mut attrs = names
                    .iter()
                    .map(|n| n.parse::<OptionalAttribute>())
                    .collect::<Result<Vec<_>>>()?;
                attrs.sort();
                attrs.dedup();
                Ok::<_, SimviewError>(attrs)
            })
            .transpose()?;

        Ok(BodySpec {
            name: b.name.clone(),
            shape,
            initial_poses,
            points,
            declared_attributes,
        })
    }
}

impl StaticObjectSpec {
    fn from_payload(s: &StaticObjectPayload, sim_batches: usize) -> Result<Self> {
        let shapes = if s.is_singleton {
            let v = s.shape.as_ref().ok_or_else(|| {
                SimviewError::malformed(format!("static object '{}' has no shape", s.name))
            })?;
            StaticShapes::Singleton(Shape::from_json(v)?)
        } else {
            let list = s.shapes.as_ref().ok_or_else(|| {
                SimviewError::malformed(format!("static object '{}' has no shapes", s.name))
            })?;
            if list.len() != sim_batches {
                return Err(SimviewError::malformed(format!(
                    "static object '{}' has {} shapes for {} batches",
                    s.name,
                    list.len(),
                    sim_batches
                )));
            }
            StaticShapes::Batched(list.iter().map(Shape::from_json).collect::<Result<Vec<_>>>()?)
        };

        let pose = match &s.body_transform {
            None => Pose::IDENTITY,
            Some(t) => Pose::from_transform(t).ok_or_else(|| {
                SimviewError::malformed(format!("static object '{}': bodyTransform needs 7 values", s.name))
            })?,
        };

        Ok(StaticObjectSpec {
            name: s.name.clone(),
            shapes,
            pose,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Two batches, 2x2 shared terrain, one box.
    pub(crate) fn two_batch_model() -> Value {
        json!({
            "simBatches": 2,
            "scalarNames": ["energy"],
            "dt": 0.1,
            "terrain": {
                "dimensions": {"sizeX": 10.0, "sizeY": 10.0, "resolutionX": 2, "resolutionY": 2},
                "bounds": {"minX": -5, "maxX": 5, "minY": -5, "maxY": 5, "minZ": 0, "maxZ": 0},
                "heightData": [0.0, 0.0, 0.0, 0.0],
                "normals": [[0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1]]
            },
            "bodies": [
                {"name": "Box", "shape": {"type": "box", "hx": 0.5, "hy": 0.5, "hz": 0.5}}
            ]
        })
    }

    #[test]
    fn parses_minimal_model() {
        let m = Model::from_value(two_batch_model()).unwrap();
        assert_eq!(m.sim_batches, 2);
        assert_eq!(m.dt, Some(0.1));
        assert!(m.terrain.singleton);
        assert_eq!(m.bodies[0].points.len(), 8);
        assert!(m.bodies[0].declared_attributes.is_none());
    }

    #[test]
    fn height_length_mismatch_is_fatal() {
        let mut v = two_batch_model();
        v["terrain"]["heightData"] = json!([0.0, 0.0, 0.0]);
        assert!(matches!(Model::from_value(v), Err(SimviewError::MalformedModel(_))));
    }

    #[test]
    fn overflowing_resolution_is_fatal() {
        let mut v = two_batch_model();
        v["terrain"]["dimensions"]["resolutionX"] = json!(usize::MAX);
        v["terrain"]["dimensions"]["resolutionY"] = json!(usize::MAX);
        v["terrain"]["heightData"] = json!([]);
        v["terrain"]["normals"] = json!([]);
        assert!(matches!(Model::from_value(v), Err(SimviewError::MalformedModel(_))));
    }

    #[test]
    fn missing_terrain_is_fatal() {
        let mut v = two_batch_model();
        v.as_object_mut().unwrap().remove("terrain");
        assert!(Model::from_value(v).is_err());
    }

    #[test]
    fn missing_shape_is_fatal() {
        let mut v = two_batch_model();
        v["bodies"] = json!([{"name": "Ghost"}]);
        assert!(Model::from_value(v).is_err());
    }

    #[test]
    fn batched_terrain_needs_one_layer_per_batch() {
        let mut v = two_batch_model();
        v["terrain"]["heightData"] = json!([[0, 0, 0, 0], [1, 1, 1, 1]]);
        v["terrain"]["normals"] = json!([
            [[0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1]],
            [[0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1]]
        ]);
        v["terrain"]["isSingleton"] = json!(false);
        let m = Model::from_value(v.clone()).unwrap();
        assert!(!m.terrain.singleton);
        assert_eq!(m.terrain.heights[1], vec![1.0; 4]);

        v["terrain"]["normals"] = json!([[0, 0, 1], [0, 0, 1], [0, 0, 1], [0, 0, 1]]);
        assert!(Model::from_value(v).is_err());
    }

    #[test]
    fn declared_attributes_are_parsed() {
        let mut v = two_batch_model();
        v["bodies"][0]["availableAttributes"] = json!(["force", "velocity", "force"]);
        let m = Model::from_value(v.clone()).unwrap();
        assert_eq!(
            m.bodies[0].declared_attributes,
            Some(vec![OptionalAttribute::Velocity, OptionalAttribute::Force])
        );

        v["bodies"][0]["availableAttributes"] = json!(["acceleration"]);
        assert!(Model::from_value(v).is_err());
    }

    #[test]
    fn batched_static_object_must_match_batch_count() {
        let mut v = two_batch_model();
        v["staticObjects"] = json!([
            {"name": "walls", "isSingleton": false, "shapes": [{"type": "sphere", "radius": 1}]}
        ]);
        assert!(Model::from_value(v.clone()).is_err());

        v["staticObjects"][0]["shapes"] = json!([
            {"type": "sphere", "radius": 1},
            {"type": "sphere", "radius": 2}
        ]);
        let m = Model::from_value(v).unwrap();
        assert!(matches!(m.static_objects[0].shapes, StaticShapes::Batched(ref s) if s.len() == 2));
    }

    #[test]
    fn zero_batches_is_rejected() {
        let mut v = two_batch_model();
        v["simBatches"] = json!(0);
        assert!(Model::from_value(v).is_err());
    }
}
