use crate::model::{Bounds, TerrainSpec};
use crate::state::Snapshot;

use super::{EntityKind, SceneEntity};

/// Height grid shared by all batches, or one grid per batch.
///
/// Samples are row-major with x varying fastest: index `iy * resolution_x + ix`.
#[derive(Debug, Clone)]
pub struct Terrain {
    spec: TerrainSpec,
    sim_batches: usize,
}

impl Terrain {
    pub fn new(spec: &TerrainSpec, sim_batches: usize) -> Self {
        Self {
            spec: spec.clone(),
            sim_batches,
        }
    }

    pub fn size(&self) -> [f32; 2] {
        [self.spec.size_x, self.spec.size_y]
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.spec.resolution_x, self.spec.resolution_y)
    }

    pub fn bounds(&self) -> Bounds {
        self.spec.bounds
    }

    pub fn is_singleton(&self) -> bool {
        self.spec.singleton
    }

    fn layer(&self, batch: usize) -> usize {
        if self.spec.singleton {
            0
        } else {
            batch.min(self.spec.heights.len().saturating_sub(1))
        }
    }

    /// Local x/y origin of the grid; falls back to centring on 0 when no bounds were given.
    fn origin(&self) -> [f32; 2] {
        let b = self.spec.bounds;
        let x = if b.max_x > b.min_x { b.min_x } else { -self.spec.size_x * 0.5 };
        let y = if b.max_y > b.min_y { b.min_y } else { -self.spec.size_y * 0.5 };
        [x, y]
    }

    pub fn height(&self, batch: usize, ix: usize, iy: usize) -> Option<f32> {
        let (rx, ry) = self.resolution();
        if ix >= rx || iy >= ry {
            return None;
        }
        self.spec.heights.get(self.layer(batch))?.get(iy * rx + ix).copied()
    }

    pub fn normal(&self, batch: usize, ix: usize, iy: usize) -> Option<[f32; 3]> {
        let (rx, ry) = self.resolution();
        if ix >= rx || iy >= ry {
            return None;
        }
        self.spec.normals.get(self.layer(batch))?.get(iy * rx + ix).copied()
    }

    /// Grid vertex in batch-local world coordinates (before the batch offset).
    pub fn vertex(&self, batch: usize, ix: usize, iy: usize) -> Option<[f32; 3]> {
        let z = self.height(batch, ix, iy)?;
        let (rx, ry) = self.resolution();
        let [x0, y0] = self.origin();
        let fx = if rx > 1 { ix as f32 / (rx - 1) as f32 } else { 0.5 };
        let fy = if ry > 1 { iy as f32 / (ry - 1) as f32 } else { 0.5 };
        Some([x0 + fx * self.spec.size_x, y0 + fy * self.spec.size_y, z])
    }

    /// Min / max height over every layer.
    pub fn height_range(&self) -> (f32, f32) {
        self.spec
            .heights
            .iter()
            .flatten()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }
}

impl SceneEntity for Terrain {
    fn name(&self) -> &str {
        "terrain"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Terrain
    }

    fn batch_count(&self) -> usize {
        self.sim_batches
    }

    fn update_state(&mut self, _snapshot: &Snapshot) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(singleton: bool) -> TerrainSpec {
        TerrainSpec {
            size_x: 10.0,
            size_y: 10.0,
            resolution_x: 3,
            resolution_y: 2,
            bounds: Bounds {
                min_x: -5.0,
                max_x: 5.0,
                min_y: -5.0,
                max_y: 5.0,
                min_z: 0.0,
                max_z: 5.0,
            },
            heights: if singleton {
                vec![vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]]
            } else {
                vec![vec![0.0; 6], vec![1.0; 6]]
            },
            normals: if singleton {
                vec![vec![[0.0, 0.0, 1.0]; 6]]
            } else {
                vec![vec![[0.0, 0.0, 1.0]; 6]; 2]
            },
            singleton,
        }
    }

    #[test]
    fn vertices_span_the_bounds() {
        let t = Terrain::new(&spec(true), 2);
        assert_eq!(t.vertex(0, 0, 0), Some([-5.0, -5.0, 0.0]));
        assert_eq!(t.vertex(1, 2, 1), Some([5.0, 5.0, 5.0]));
        assert_eq!(t.vertex(0, 1, 0), Some([0.0, -5.0, 1.0]));
        assert_eq!(t.vertex(0, 3, 0), None);
    }

    #[test]
    fn batched_terrain_reads_its_own_layer() {
        let t = Terrain::new(&spec(false), 2);
        assert_eq!(t.height(0, 1, 1), Some(0.0));
        assert_eq!(t.height(1, 1, 1), Some(1.0));
        assert_eq!(t.height_range(), (0.0, 1.0));
    }
}
