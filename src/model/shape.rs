//! Body and static-object shapes.
//!
//! The wire form is a JSON object with a `type` tag plus per-kind dimensions.
//! The tag is a string (`box`, `sphere`, `cylinder`, `mesh`, `pointcloud`) or
//! one of the legacy numeric codes `0..=4` in that order. Resolution happens
//! once at ingestion; nothing downstream looks at the raw tag again.

use serde_json::{json, Map, Value};

use crate::error::{Result, SimviewError};

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Box { hx: f32, hy: f32, hz: f32 },
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    Mesh { vertices: Vec<[f32; 3]>, faces: Vec<[u32; 3]> },
    PointCloud { points: Vec<[f32; 3]> },
    /// Unknown string tag. Drawn as a marker at the body origin.
    Custom { kind: String },
}

const CODES: [&str; 5] = ["box", "sphere", "cylinder", "mesh", "pointcloud"];

impl Shape {
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| SimviewError::malformed("shape must be an object"))?;
        let tag = obj
            .get("type")
            .ok_or_else(|| SimviewError::malformed("shape has no 'type'"))?;

        let kind = match tag {
            Value::String(s) => s.to_ascii_lowercase(),
            Value::Number(n) => {
                let code = n
                    .as_u64()
                    .filter(|c| (*c as usize) < CODES.len())
                    .ok_or_else(|| SimviewError::malformed(format!("unknown shape code {}", n)))?;
                CODES[code as usize].to_string()
            }
            _ => return Err(SimviewError::malformed("shape 'type' must be a string or number")),
        };

        Ok(match kind.as_str() {
            "box" => Shape::Box {
                hx: dim(obj, "hx")?,
                hy: dim(obj, "hy")?,
                hz: dim(obj, "hz")?,
            },
            "sphere" => Shape::Sphere { radius: dim(obj, "radius")? },
            "cylinder" => Shape::Cylinder {
                radius: dim(obj, "radius")?,
                height: dim(obj, "height")?,
            },
            "mesh" => Shape::Mesh {
                vertices: array_field(obj, "vertices")?,
                faces: array_field(obj, "faces")?,
            },
            "pointcloud" => Shape::PointCloud { points: array_field(obj, "points")? },
            _ => Shape::Custom { kind },
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            Shape::Box { hx, hy, hz } => json!({"type": "box", "hx": hx, "hy": hy, "hz": hz}),
            Shape::Sphere { radius } => json!({"type": "sphere", "radius": radius}),
            Shape::Cylinder { radius, height } => {
                json!({"type": "cylinder", "radius": radius, "height": height})
            }
            Shape::Mesh { vertices, faces } => {
                json!({"type": "mesh", "vertices": vertices, "faces": faces})
            }
            Shape::PointCloud { points } => json!({"type": "pointcloud", "points": points}),
            Shape::Custom { kind } => json!({ "type": kind }),
        }
    }

    pub fn kind_name(&self) -> &str {
        match self {
            Shape::Box { .. } => "box",
            Shape::Sphere { .. } => "sphere",
            Shape::Cylinder { .. } => "cylinder",
            Shape::Mesh { .. } => "mesh",
            Shape::PointCloud { .. } => "pointcloud",
            Shape::Custom { kind } => kind,
        }
    }

    /// Body-local points that contact indices refer to when the model gives
    /// no explicit `bodyPoints`.
    pub fn contact_points(&self) -> Vec<[f32; 3]> {
        match self {
            Shape::PointCloud { points } => points.clone(),
            Shape::Mesh { vertices, .. } => vertices.clone(),
            Shape::Box { hx, hy, hz } => box_corners(*hx, *hy, *hz).to_vec(),
            _ => Vec::new(),
        }
    }

    /// Body-local line segments approximating the shape's outline.
    pub fn outline(&self) -> Vec<([f32; 3], [f32; 3])> {
        match self {
            Shape::Box { hx, hy, hz } => {
                let c = box_corners(*hx, *hy, *hz);
                BOX_EDGES.iter().map(|&(a, b)| (c[a], c[b])).collect()
            }
            Shape::Sphere { radius } => {
                let mut segs = circle(*radius, 0.0, Plane::Xy);
                segs.extend(circle(*radius, 0.0, Plane::Xz));
                segs.extend(circle(*radius, 0.0, Plane::Yz));
                segs
            }
            Shape::Cylinder { radius, height } => {
                let h = height * 0.5;
                let mut segs = circle(*radius, -h, Plane::Xy);
                segs.extend(circle(*radius, h, Plane::Xy));
                for k in 0..4 {
                    let a = k as f32 * std::f32::consts::FRAC_PI_2;
                    let (s, c) = a.sin_cos();
                    segs.push(([radius * c, radius * s, -h], [radius * c, radius * s, h]));
                }
                segs
            }
            Shape::Mesh { vertices, faces } => {
                let v = |i: u32| vertices.get(i as usize).copied();
                let mut segs = Vec::with_capacity(faces.len() * 3);
                for f in faces {
                    for (a, b) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
                        if let (Some(pa), Some(pb)) = (v(a), v(b)) {
                            segs.push((pa, pb));
                        }
                    }
                }
                segs
            }
            Shape::PointCloud { .. } | Shape::Custom { .. } => Vec::new(),
        }
    }

    /// Radius of a sphere around the local origin that contains the shape.
    pub fn bounding_radius(&self) -> f32 {
        let far = |pts: &[[f32; 3]]| {
            pts.iter()
                .map(|p| crate::math::length(*p))
                .fold(0.0f32, f32::max)
        };
        match self {
            Shape::Box { hx, hy, hz } => (hx * hx + hy * hy + hz * hz).sqrt(),
            Shape::Sphere { radius } => *radius,
            Shape::Cylinder { radius, height } => (radius * radius + height * height * 0.25).sqrt(),
            Shape::Mesh { vertices, .. } => far(vertices),
            Shape::PointCloud { points } => far(points),
            Shape::Custom { .. } => 0.1,
        }
    }
}

fn dim(obj: &Map<String, Value>, key: &str) -> Result<f32> {
    obj.get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .ok_or_else(|| SimviewError::malformed(format!("shape is missing numeric '{}'", key)))
}

fn array_field<T: serde::de::DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Result<T> {
    let raw = obj
        .get(key)
        .ok_or_else(|| SimviewError::malformed(format!("shape is missing '{}'", key)))?;
    T::deserialize(raw).map_err(|e| SimviewError::malformed(format!("shape '{}': {}", key, e)))
}

fn box_corners(hx: f32, hy: f32, hz: f32) -> [[f32; 3]; 8] {
    [
        [-hx, -hy, -hz],
        [hx, -hy, -hz],
        [hx, hy, -hz],
        [-hx, hy, -hz],
        [-hx, -hy, hz],
        [hx, -hy, hz],
        [hx, hy, hz],
        [-hx, hy, hz],
    ]
}

const BOX_EDGES: [(usize, usize); 12] = [
    (0, 1), (1, 2), (2, 3), (3, 0),
    (4, 5), (5, 6), (6, 7), (7, 4),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

#[derive(Clone, Copy)]
enum Plane {
    Xy,
    Xz,
    Yz,
}

fn circle(radius: f32, offset: f32, plane: Plane) -> Vec<([f32; 3], [f32; 3])> {
    const SEGMENTS: usize = 24;
    let point = |k: usize| {
        let a = k as f32 / SEGMENTS as f32 * std::f32::consts::TAU;
        let (s, c) = a.sin_cos();
        let (u, v) = (radius * c, radius * s);
        match plane {
            Plane::Xy => [u, v, offset],
            Plane::Xz => [u, offset, v],
            Plane::Yz => [offset, u, v],
        }
    };
    (0..SEGMENTS).map(|k| (point(k), point(k + 1))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_and_numeric_tags_agree() {
        let a = Shape::from_json(&json!({"type": "sphere", "radius": 0.5})).unwrap();
        let b = Shape::from_json(&json!({"type": 1, "radius": 0.5})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Shape::Sphere { radius: 0.5 });
    }

    #[test]
    fn unknown_string_is_custom() {
        let s = Shape::from_json(&json!({"type": "capsule"})).unwrap();
        assert_eq!(s, Shape::Custom { kind: "capsule".into() });
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(Shape::from_json(&json!({"type": 7})).is_err());
        assert!(Shape::from_json(&json!({"type": -1})).is_err());
    }

    #[test]
    fn missing_dimension_is_rejected() {
        let err = Shape::from_json(&json!({"type": "box", "hx": 1.0, "hy": 1.0})).unwrap_err();
        assert!(err.to_string().contains("hz"));
    }

    #[test]
    fn mesh_parses_vertices_and_faces() {
        let s = Shape::from_json(&json!({
            "type": "mesh",
            "vertices": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            "faces": [[0, 1, 2]]
        }))
        .unwrap();
        assert_eq!(s.contact_points().len(), 3);
        assert_eq!(s.outline().len(), 3);
    }

    #[test]
    fn box_contact_points_are_corners() {
        let s = Shape::Box { hx: 1.0, hy: 2.0, hz: 3.0 };
        let pts = s.contact_points();
        assert_eq!(pts.len(), 8);
        assert!(pts.contains(&[1.0, 2.0, 3.0]));
        assert_eq!(s.outline().len(), 12);
    }

    #[test]
    fn json_round_trips_through_wire_form() {
        let s = Shape::Cylinder { radius: 0.25, height: 2.0 };
        assert_eq!(Shape::from_json(&s.to_json()).unwrap(), s);
    }
}
