//! Programmatic construction of a recording.
//!
//! [`SimulationScene`] assembles the model payload and a list of states, then
//! writes the combined `{"model": …, "states": …}` document the file transport
//! reads. The model is run through the same validation as a loaded one before
//! it is written, so a saved file always loads.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::{Result, SimviewError};
use crate::math::{Pose, Quat};
use crate::model::{
    Batchable, BodyPayload, Bounds, Dimensions, Model, ModelPayload, OptionalAttribute, Shape,
    StaticObjectPayload, TerrainPayload,
};
use crate::state::{BodyStatePayload, StatePayload};

fn invalid(msg: impl Into<String>) -> SimviewError {
    SimviewError::InvalidScene(msg.into())
}

/// Height grid for one or more batches, row-major with x varying fastest.
#[derive(Debug, Clone)]
pub struct HeightGrid {
    pub resolution_x: usize,
    pub resolution_y: usize,
    /// One layer shared by all batches, or one per batch.
    pub heights: Vec<Vec<f32>>,
    pub normals: Vec<Vec<[f32; 3]>>,
}

impl HeightGrid {
    /// Sample `f(x, y)` on a regular grid spanning the given limits. Normals
    /// come from central differences.
    pub fn sample(
        resolution_x: usize,
        resolution_y: usize,
        x_lim: (f32, f32),
        y_lim: (f32, f32),
        f: impl Fn(f32, f32) -> f32,
    ) -> Self {
        let step = |lim: (f32, f32), n: usize| if n > 1 { (lim.1 - lim.0) / (n - 1) as f32 } else { 0.0 };
        let (dx, dy) = (step(x_lim, resolution_x), step(y_lim, resolution_y));
        let mut heights = Vec::with_capacity(resolution_x * resolution_y);
        let mut normals = Vec::with_capacity(resolution_x * resolution_y);
        for iy in 0..resolution_y {
            for ix in 0..resolution_x {
                let x = x_lim.0 + ix as f32 * dx;
                let y = y_lim.0 + iy as f32 * dy;
                heights.push(f(x, y));
                let e = 1e-3;
                let gx = (f(x + e, y) - f(x - e, y)) / (2.0 * e);
                let gy = (f(x, y + e) - f(x, y - e)) / (2.0 * e);
                let n = crate::math::normalize([-gx, -gy, 1.0]).map_or([0.0, 0.0, 1.0], |(v, _)| v);
                normals.push(n);
            }
        }
        Self {
            resolution_x,
            resolution_y,
            heights: vec![heights],
            normals: vec![normals],
        }
    }

    /// Flat ground at height `z`.
    pub fn flat(resolution_x: usize, resolution_y: usize, z: f32) -> Self {
        let cells = resolution_x * resolution_y;
        Self {
            resolution_x,
            resolution_y,
            heights: vec![vec![z; cells]],
            normals: vec![vec![[0.0, 0.0, 1.0]; cells]],
        }
    }
}

/// One body's state across all batches at one instant.
#[derive(Debug, Clone)]
pub struct BodyState {
    name: String,
    poses: Vec<Pose>,
    vectors: BTreeMap<OptionalAttribute, Vec<[f32; 3]>>,
    contacts: Option<Vec<Vec<usize>>>,
}

impl BodyState {
    /// `poses` holds one pose per batch.
    pub fn new(name: impl Into<String>, poses: Vec<Pose>) -> Self {
        Self {
            name: name.into(),
            poses,
            vectors: BTreeMap::new(),
            contacts: None,
        }
    }

    /// Per-batch values for a vector attribute.
    pub fn with_vector(mut self, attr: OptionalAttribute, values: Vec<[f32; 3]>) -> Result<Self> {
        if attr == OptionalAttribute::Contacts {
            return Err(invalid("contacts are not a vector attribute"));
        }
        self.vectors.insert(attr, values);
        Ok(self)
    }

    /// Per-batch lists of active contact point indices.
    pub fn with_contacts(mut self, contacts: Vec<Vec<usize>>) -> Self {
        self.contacts = Some(contacts);
        self
    }

    /// Per-batch boolean masks over the body's contact points.
    pub fn with_contact_mask(self, masks: &[Vec<bool>]) -> Self {
        let contacts = masks
            .iter()
            .map(|m| m.iter().enumerate().filter_map(|(i, on)| on.then_some(i)).collect())
            .collect();
        self.with_contacts(contacts)
    }

    fn to_payload(&self) -> BodyStatePayload {
        let batched = |rows: Vec<Vec<f32>>| Some(Batchable::Batched(rows));
        let vec_field = |attr| {
            self.vectors
                .get(&attr)
                .and_then(|v| batched(v.iter().map(|x| x.to_vec()).collect()))
        };
        BodyStatePayload {
            name: self.name.clone(),
            body_transform: batched(self.poses.iter().map(|p| p.to_transform().to_vec()).collect()),
            velocity: vec_field(OptionalAttribute::Velocity),
            angular_velocity: vec_field(OptionalAttribute::AngularVelocity),
            force: vec_field(OptionalAttribute::Force),
            torque: vec_field(OptionalAttribute::Torque),
            contacts: self.contacts.as_ref().map(|c| {
                Batchable::Batched(c.iter().map(|b| b.iter().map(|&i| i as i64).collect()).collect())
            }),
            ..BodyStatePayload::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationScene {
    sim_batches: usize,
    scalar_names: Vec<String>,
    dt: f64,
    collapse: bool,
    terrain: Option<TerrainPayload>,
    bodies: Vec<BodyPayload>,
    static_objects: Vec<StaticObjectPayload>,
    states: Vec<StatePayload>,
}

impl SimulationScene {
    pub fn new<S: Into<String>>(sim_batches: usize, scalar_names: impl IntoIterator<Item = S>, dt: f64) -> Self {
        Self {
            sim_batches,
            scalar_names: scalar_names.into_iter().map(Into::into).collect(),
            dt,
            collapse: false,
            terrain: None,
            bodies: Vec::new(),
            static_objects: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Draw every batch on top of each other instead of in a grid.
    pub fn with_collapse(mut self, collapse: bool) -> Self {
        self.collapse = collapse;
        self
    }

    pub fn sim_batches(&self) -> usize {
        self.sim_batches
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// A single layer is shared by every batch; otherwise one layer per batch.
    pub fn create_terrain(&mut self, grid: HeightGrid, x_lim: (f32, f32), y_lim: (f32, f32)) -> Result<()> {
        if self.terrain.is_some() {
            return Err(invalid("terrain already exists"));
        }
        let (hl, nl) = (grid.heights.len(), grid.normals.len());
        let singleton = hl == 1 && nl == 1;
        if !singleton && (hl != self.sim_batches || nl != self.sim_batches) {
            return Err(invalid(format!(
                "batched terrain layers ({}, {}) must match batch count {}",
                hl, nl, self.sim_batches
            )));
        }
        let cells = grid.resolution_x * grid.resolution_y;
        if grid.heights.iter().any(|l| l.len() != cells) || grid.normals.iter().any(|l| l.len() != cells) {
            return Err(invalid(format!(
                "terrain layers must hold {}x{} values",
                grid.resolution_x, grid.resolution_y
            )));
        }

        let (min_z, max_z) = grid
            .heights
            .iter()
            .flatten()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        let (min_z, max_z) = if min_z <= max_z { (min_z, max_z) } else { (0.0, 0.0) };

        let (height_data, normals) = if singleton {
            let mut h = grid.heights;
            let mut n = grid.normals;
            (Batchable::Flat(h.remove(0)), Batchable::Flat(n.remove(0)))
        } else {
            (Batchable::Batched(grid.heights), Batchable::Batched(grid.normals))
        };

        self.terrain = Some(TerrainPayload {
            dimensions: Dimensions {
                size_x: x_lim.1 - x_lim.0,
                size_y: y_lim.1 - y_lim.0,
                resolution_x: grid.resolution_x,
                resolution_y: grid.resolution_y,
            },
            bounds: Bounds {
                min_x: x_lim.0,
                max_x: x_lim.1,
                min_y: y_lim.0,
                max_y: y_lim.1,
                min_z,
                max_z,
            },
            height_data,
            normals,
            is_singleton: Some(singleton),
        });
        Ok(())
    }

    pub fn create_body(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        available_attributes: &[OptionalAttribute],
    ) -> Result<()> {
        let name = name.into();
        if self.bodies.iter().any(|b| b.name == name) {
            return Err(invalid(format!("dynamic body {} already exists", name)));
        }
        let attrs = (!available_attributes.is_empty()).then(|| {
            available_attributes
                .iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|a| a.wire_name().to_string())
                .collect()
        });
        self.bodies.push(BodyPayload {
            name,
            shape: Some(shape.to_json()),
            body_transform: None,
            body_points: None,
            available_attributes: attrs,
        });
        Ok(())
    }

    fn check_static_name(&self, name: &str) -> Result<()> {
        if self.static_objects.iter().any(|s| s.name == name) {
            return Err(invalid(format!("static object {} already exists", name)));
        }
        Ok(())
    }

    /// One shape drawn identically in every batch.
    pub fn create_static_object_singleton(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        pose: Option<Pose>,
    ) -> Result<()> {
        let name = name.into();
        self.check_static_name(&name)?;
        self.static_objects.push(StaticObjectPayload {
            name,
            is_singleton: true,
            shape: Some(shape.to_json()),
            shapes: None,
            body_transform: pose.map(|p| p.to_transform().to_vec()),
        });
        Ok(())
    }

    /// One shape per batch.
    pub fn create_static_object_batched(
        &mut self,
        name: impl Into<String>,
        shapes: Vec<Shape>,
        pose: Option<Pose>,
    ) -> Result<()> {
        let name = name.into();
        self.check_static_name(&name)?;
        if shapes.len() != self.sim_batches {
            return Err(invalid(format!(
                "batched static object '{}' has {} shapes, expected {}",
                name,
                shapes.len(),
                self.sim_batches
            )));
        }
        self.static_objects.push(StaticObjectPayload {
            name,
            is_singleton: false,
            shape: None,
            shapes: Some(shapes.iter().map(Shape::to_json).collect()),
            body_transform: pose.map(|p| p.to_transform().to_vec()),
        });
        Ok(())
    }

    /// Append one snapshot. `scalars` must name exactly the declared scalars.
    pub fn add_state(&mut self, time: f64, bodies: &[BodyState], scalars: &[(&str, Vec<f32>)]) -> Result<()> {
        let mut extra = Map::new();
        if self.scalar_names.is_empty() {
            if !scalars.is_empty() {
                log::warn!("Ignoring scalar values: the scene declares no scalar names");
            }
        } else {
            let given: BTreeSet<&str> = scalars.iter().map(|(k, _)| *k).collect();
            let declared: BTreeSet<&str> = self.scalar_names.iter().map(String::as_str).collect();
            if given != declared || given.len() != scalars.len() {
                return Err(invalid(format!(
                    "scalar keys {:?} do not match declared scalars {:?}",
                    given, declared
                )));
            }
            for (name, values) in scalars {
                extra.insert(name.to_string(), json!(values));
            }
        }
        self.states.push(StatePayload {
            time,
            bodies: bodies.iter().map(BodyState::to_payload).collect(),
            extra,
        });
        Ok(())
    }

    pub fn model_payload(&self) -> ModelPayload {
        ModelPayload {
            sim_batches: self.sim_batches,
            scalar_names: self.scalar_names.clone(),
            dt: Some(self.dt),
            collapse: self.collapse,
            terrain: self.terrain.clone(),
            bodies: self.bodies.clone(),
            static_objects: self.static_objects.clone(),
        }
    }

    /// The combined document; fails when the model would not load.
    pub fn to_json(&self) -> Result<Value> {
        if self.terrain.is_none() {
            return Err(invalid("cannot save a scene without terrain"));
        }
        let payload = self.model_payload();
        Model::from_payload(payload.clone())
            .map_err(|e| invalid(format!("scene does not form a valid model: {}", e)))?;
        Ok(json!({
            "model": serde_json::to_value(&payload)?,
            "states": serde_json::to_value(&self.states)?,
        }))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let doc = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(&doc)?)?;
        log::info!("Saved {} states to {}", self.states.len(), path.display());
        Ok(())
    }
}

/// Two batches over a wavy 100x100 terrain: batch 0 rises while spinning
/// about z, batch 1 sits still at x = 2.
pub fn demo_scene() -> Result<SimulationScene> {
    let mut scene = SimulationScene::new(2, ["energy"], 0.1);
    let grid = HeightGrid::sample(100, 100, (-5.0, 5.0), (-5.0, 5.0), |x, y| 0.2 * x.sin() * y.cos());
    scene.create_terrain(grid, (-5.0, 5.0), (-5.0, 5.0))?;
    scene.create_body(
        "Box",
        Shape::Box {
            hx: 0.5,
            hy: 0.5,
            hz: 0.5,
        },
        &[],
    )?;

    for t in 0..50 {
        let time = t as f32 * 0.1;
        let angle = time * 0.5;
        let spinning = Pose {
            position: [0.0, 0.0, time * 0.5 + 1.0],
            orientation: Quat::from_wxyz([(angle / 2.0).cos(), 0.0, 0.0, (angle / 2.0).sin()]),
        };
        let still = Pose {
            position: [2.0, 0.0, 1.0],
            orientation: Quat::IDENTITY,
        };
        scene.add_state(
            t as f64 * 0.1,
            &[BodyState::new("Box", vec![spinning, still])],
            &[("energy", vec![10.0 - t as f32 * 0.1, 5.0])],
        )?;
    }
    Ok(scene)
}
