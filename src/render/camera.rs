//! Orbit camera and pinhole projection (z-up world).

use crate::math::{self, cross, dot, normalize, sub};

/// Camera parameters for interactive 3D navigation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    /// Horizontal orbit angle in radians around +z (0 = looking along +y)
    pub azimuth: f32,
    /// Vertical orbit angle in radians (0 = level, positive = looking down)
    pub elevation: f32,
    /// Distance from the camera to the target point
    pub distance: f32,
    /// Target point the camera looks at [x, y, z]
    pub target: [f32; 3],
    pub fov_deg: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            azimuth: 0.6,
            elevation: 0.5,
            distance: 15.0,
            target: [0.0, 0.0, 0.0],
            fov_deg: 50.0,
        }
    }
}

impl CameraParams {
    /// Frame an axis-aligned box given by its min / max corners.
    pub fn framing(min: [f32; 3], max: [f32; 3]) -> Self {
        let center = math::scale(math::add(min, max), 0.5);
        let extent = sub(max, min);
        let max_ext = extent[0].max(extent[1].max(extent[2])).max(0.5);
        Self {
            distance: max_ext * 1.6,
            target: center,
            ..Self::default()
        }
    }

    pub fn orbit(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth += d_azimuth;
        self.elevation = (self.elevation + d_elevation).clamp(-1.5, 1.5);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(0.1, 10_000.0);
    }

    pub fn eye(&self) -> [f32; 3] {
        let (sa, ca) = self.azimuth.sin_cos();
        let (se, ce) = self.elevation.sin_cos();
        math::add(
            self.target,
            [
                -self.distance * sa * ce,
                -self.distance * ca * ce,
                self.distance * se,
            ],
        )
    }
}

/// Look-at basis derived from [`CameraParams`].
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    origin: [f32; 3],
    forward: [f32; 3],
    right: [f32; 3],
    up: [f32; 3],
    fov_factor: f32,
}

impl Camera {
    pub fn look_at(eye: [f32; 3], target: [f32; 3], fov_deg: f32) -> Self {
        let forward = normalize(sub(target, eye)).map_or([0.0, 1.0, 0.0], |(v, _)| v);
        let world_up = [0.0, 0.0, 1.0];
        let right = normalize(cross(forward, world_up)).map_or([1.0, 0.0, 0.0], |(v, _)| v);
        let up = cross(right, forward);
        let fov_factor = (fov_deg.to_radians() * 0.5).tan();
        Self {
            origin: eye,
            forward,
            right,
            up,
            fov_factor,
        }
    }

    pub fn from_params(p: &CameraParams) -> Self {
        Self::look_at(p.eye(), p.target, p.fov_deg)
    }

    /// World point to pixel coordinates plus view depth. `None` behind the camera.
    pub fn project(&self, p: [f32; 3], width: usize, height: usize) -> Option<(f32, f32, f32)> {
        let rel = sub(p, self.origin);
        let z = dot(rel, self.forward);
        if z <= 1e-3 {
            return None;
        }
        let aspect = width as f32 / height.max(1) as f32;
        let u = dot(rel, self.right) / (z * self.fov_factor * aspect);
        let v = dot(rel, self.up) / (z * self.fov_factor);
        let px = (u + 1.0) * 0.5 * width as f32;
        let py = (1.0 - v) * 0.5 * height as f32;
        Some((px, py, z))
    }

    /// Vertical component of the view direction through pixel row `py` (-1 bottom, 1 top).
    pub fn row_elevation(&self, py: usize, height: usize) -> f32 {
        let v = -((py as f32 + 0.5) / height.max(1) as f32 * 2.0 - 1.0);
        let dir = math::add(self.forward, math::scale(self.up, v * self.fov_factor));
        normalize(dir).map_or(0.0, |(d, _)| d[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn target_projects_to_centre() {
        let params = CameraParams::default();
        let cam = Camera::from_params(&params);
        let (x, y, z) = cam.project(params.target, 200, 100).unwrap();
        assert_relative_eq!(x, 100.0, epsilon = 1e-3);
        assert_relative_eq!(y, 50.0, epsilon = 1e-3);
        assert_relative_eq!(z, params.distance, epsilon = 1e-3);
    }

    #[test]
    fn points_behind_are_culled() {
        let params = CameraParams::default();
        let cam = Camera::from_params(&params);
        let behind = math::add(params.eye(), sub(params.eye(), params.target));
        assert!(cam.project(behind, 200, 100).is_none());
    }

    #[test]
    fn higher_points_appear_higher() {
        let params = CameraParams::default();
        let cam = Camera::from_params(&params);
        let (_, y0, _) = cam.project([0.0, 0.0, 0.0], 200, 100).unwrap();
        let (_, y1, _) = cam.project([0.0, 0.0, 1.0], 200, 100).unwrap();
        assert!(y1 < y0);
    }
}
