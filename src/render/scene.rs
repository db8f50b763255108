//! CPU wireframe renderer for the batched scene.
//!
//! Every batch is drawn at its layout offset: terrain as a strided wire grid
//! tinted with the batch colour, static objects and bodies as shape outlines,
//! vector attributes as arrows and contact points as dots.

use crate::entity::attribute::{AttributeKind, VectorAttribute};
use crate::entity::{Body, Scene};
use crate::layout::{BatchLayout, Rgba};
use crate::math::{self, Pose};
use crate::render::camera::{Camera, CameraParams};
use crate::render::raster::FrameBuffer;
use crate::session::Session;

/// Draws a session into a frame buffer the viewer and the recorder share.
pub trait FrameRenderer {
    fn render(&mut self, session: &Session);
    fn frame(&self) -> &FrameBuffer;
}

const BACKGROUND: [f32; 3] = [0.93, 0.94, 0.96];
const INACTIVE_CONTACT: Rgba = Rgba::rgb(150, 150, 150);
const ACTIVE_CONTACT: Rgba = Rgba::rgb(220, 40, 40);
const STATIC_COLOR: Rgba = Rgba::rgb(90, 90, 100);

fn arrow_color(kind: VectorAttribute) -> Rgba {
    match kind {
        VectorAttribute::Velocity => Rgba::rgb(30, 160, 60),
        VectorAttribute::AngularVelocity => Rgba::rgb(30, 110, 220),
        VectorAttribute::Force => Rgba::rgb(230, 120, 20),
        VectorAttribute::Torque => Rgba::rgb(160, 50, 200),
    }
}

/// Horizon-to-zenith blend by the vertical component of the view ray.
fn sky_color(dir_z: f32) -> Rgba {
    let t = (dir_z * 0.5 + 0.5).clamp(0.0, 1.0);
    let zenith = [
        (BACKGROUND[0] * 0.5).min(0.4),
        (BACKGROUND[1] * 0.6).min(0.5),
        (BACKGROUND[2] * 0.8).min(0.9),
    ];
    let ch = |i: usize| ((BACKGROUND[i] * (1.0 - t) + zenith[i] * t).clamp(0.0, 1.0) * 255.0) as u8;
    Rgba::rgb(ch(0), ch(1), ch(2))
}

/// Axis-aligned world box around every batch's terrain.
pub fn scene_bounds(scene: &Scene, layout: &BatchLayout) -> ([f32; 3], [f32; 3]) {
    let (rx, ry) = scene.terrain.resolution();
    let lo = scene.terrain.vertex(0, 0, 0).unwrap_or([0.0; 3]);
    let hi = scene
        .terrain
        .vertex(0, rx.saturating_sub(1), ry.saturating_sub(1))
        .unwrap_or(lo);
    let [ex, ey] = layout.extent();
    let cell = [hi[0] - lo[0], hi[1] - lo[1]];
    let (zmin, zmax) = scene.terrain.height_range();
    let (zmin, zmax) = if zmin <= zmax { (zmin, zmax) } else { (0.0, 1.0) };
    (
        [lo[0], lo[1], zmin],
        [lo[0] + ex.max(cell[0]), lo[1] + ey.max(cell[1]), zmax + 1.0],
    )
}

pub struct SoftwareRenderer {
    frame: FrameBuffer,
    camera: CameraParams,
    /// Model generation the camera was last fitted to.
    fitted_generation: Option<u64>,
    terrain_stride: usize,
}

impl SoftwareRenderer {
    pub fn new(width: usize, height: usize, terrain_stride: usize) -> Self {
        Self {
            frame: FrameBuffer::new(width, height),
            camera: CameraParams::default(),
            fitted_generation: None,
            terrain_stride: terrain_stride.max(1),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.frame.resize(width, height);
    }

    pub fn camera(&self) -> &CameraParams {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraParams {
        &mut self.camera
    }

    /// Re-frame the whole grid on the next render.
    pub fn reset_camera(&mut self) {
        self.fitted_generation = None;
    }

    fn fit_camera(&mut self, session: &Session) {
        let (Some(scene), Some(layout)) = (session.scene(), session.layout()) else {
            return;
        };
        let generation = session.model_generation();
        if self.fitted_generation == Some(generation) {
            return;
        }
        let (min, max) = scene_bounds(scene, layout);
        self.camera = CameraParams::framing(min, max);
        self.fitted_generation = Some(generation);
    }

    fn draw_terrain(&mut self, cam: &Camera, scene: &Scene, layout: &BatchLayout, batch: usize, active: bool) {
        let (w, h) = (self.frame.width(), self.frame.height());
        let offset = layout.offset(batch);
        let base = layout.color(batch).unwrap_or(Rgba::WHITE);
        let color = if active { base } else { base.mix(Rgba::rgb(200, 200, 200), 0.35) };
        let (rx, ry) = scene.terrain.resolution();
        let stride = self.terrain_stride;

        let project = |ix: usize, iy: usize| {
            let v = scene.terrain.vertex(batch, ix, iy)?;
            cam.project(math::add(v, offset), w, h)
        };
        let lines = |n: usize| (0..n).step_by(stride).chain(std::iter::once(n.saturating_sub(1)));

        for iy in lines(ry) {
            for ix in 1..rx {
                if let (Some(a), Some(b)) = (project(ix - 1, iy), project(ix, iy)) {
                    self.frame.line((a.0, a.1), (b.0, b.1), color);
                }
            }
        }
        for ix in lines(rx) {
            for iy in 1..ry {
                if let (Some(a), Some(b)) = (project(ix, iy - 1), project(ix, iy)) {
                    self.frame.line((a.0, a.1), (b.0, b.1), color);
                }
            }
        }
    }

    fn draw_segments(&mut self, cam: &Camera, segments: &[([f32; 3], [f32; 3])], pose: &Pose, offset: [f32; 3], color: Rgba, thick: bool) {
        let (w, h) = (self.frame.width(), self.frame.height());
        for (a, b) in segments {
            let pa = cam.project(math::add(pose.apply(*a), offset), w, h);
            let pb = cam.project(math::add(pose.apply(*b), offset), w, h);
            if let (Some(pa), Some(pb)) = (pa, pb) {
                if thick {
                    self.frame.thick_line((pa.0, pa.1), (pb.0, pb.1), color);
                } else {
                    self.frame.line((pa.0, pa.1), (pb.0, pb.1), color);
                }
            }
        }
    }

    fn draw_body(&mut self, cam: &Camera, body: &Body, layout: &BatchLayout, batch: usize, active: bool) {
        let Some(pose) = body.pose(batch) else {
            return;
        };
        let (w, h) = (self.frame.width(), self.frame.height());
        let offset = layout.offset(batch);
        let color = if active {
            Rgba::rgb(20, 20, 20)
        } else {
            layout.color(batch).unwrap_or(Rgba::BLACK).mix(Rgba::BLACK, 0.5)
        };
        self.draw_segments(cam, &body.shape().outline(), &pose, offset, color, active);

        let origin = math::add(pose.position, offset);
        for slot in body.slots() {
            match slot.kind() {
                AttributeKind::Vector(kind) => {
                    let Some(arrow) = slot.arrow(batch).filter(|a| a.is_visible()) else {
                        continue;
                    };
                    let tip = arrow.tip(origin);
                    if let (Some(a), Some(b)) = (cam.project(origin, w, h), cam.project(tip, w, h)) {
                        let c = arrow_color(kind);
                        self.frame.thick_line((a.0, a.1), (b.0, b.1), c);
                        self.frame.disc((b.0, b.1), 2.5, c);
                    }
                }
                AttributeKind::ContactList => {
                    let mask = slot.contact_mask(batch).unwrap_or(&[]);
                    for (i, local) in body.points().iter().enumerate() {
                        let on = mask.get(i).copied().unwrap_or(false);
                        let p = math::add(pose.apply(*local), offset);
                        if let Some(px) = cam.project(p, w, h) {
                            let (c, r) = if on { (ACTIVE_CONTACT, 3.0) } else { (INACTIVE_CONTACT, 1.5) };
                            self.frame.disc((px.0, px.1), r, c);
                        }
                    }
                }
            }
        }
    }
}

impl FrameRenderer for SoftwareRenderer {
    fn render(&mut self, session: &Session) {
        self.fit_camera(session);
        let cam = Camera::from_params(&self.camera);
        let height = self.frame.height();
        self.frame.clear_rows(|py| sky_color(cam.row_elevation(py, height)));

        let (Some(scene), Some(layout)) = (session.scene(), session.layout()) else {
            return;
        };
        let active_batch = session.active_batch();

        for batch in 0..layout.sim_batches() {
            let active = batch == active_batch;
            self.draw_terrain(&cam, scene, layout, batch, active);

            let offset = layout.offset(batch);
            for obj in &scene.static_objects {
                if let Some(shape) = obj.shape_for(batch) {
                    self.draw_segments(&cam, &shape.outline(), &obj.pose(), offset, STATIC_COLOR, false);
                }
            }
        }
        // bodies on top of every batch's terrain, active batch last
        for batch in (0..layout.sim_batches()).filter(|b| *b != active_batch) {
            for body in &scene.bodies {
                self.draw_body(&cam, body, layout, batch, false);
            }
        }
        for body in &scene.bodies {
            self.draw_body(&cam, body, layout, active_batch, true);
        }
    }

    fn frame(&self) -> &FrameBuffer {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::model::tests::two_batch_model;
    use crate::state::tests::two_batch_states;

    fn loaded() -> Session {
        let mut s = Session::new(ViewerConfig::default());
        s.load_model_value(two_batch_model()).unwrap();
        s.load_states_value(two_batch_states()).unwrap();
        s
    }

    fn non_background_pixels(fb: &FrameBuffer, cam: &CameraParams) -> usize {
        let c = Camera::from_params(cam);
        (0..fb.height())
            .flat_map(|y| (0..fb.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.get(x, y) != Some(sky_color(c.row_elevation(y, fb.height()))))
            .count()
    }

    #[test]
    fn empty_session_draws_only_sky() {
        let mut r = SoftwareRenderer::new(64, 48, 1);
        r.render(&Session::new(ViewerConfig::default()));
        assert_eq!(non_background_pixels(r.frame(), r.camera()), 0);
    }

    #[test]
    fn loaded_scene_draws_geometry() {
        let s = loaded();
        let mut r = SoftwareRenderer::new(160, 120, 1);
        r.render(&s);
        assert!(non_background_pixels(r.frame(), r.camera()) > 50);
    }

    #[test]
    fn camera_is_fitted_once_per_model() {
        let mut s = loaded();
        let mut r = SoftwareRenderer::new(64, 48, 1);
        r.render(&s);
        let fitted = *r.camera();
        r.camera_mut().orbit(0.3, 0.0);
        s.go_to_time(1.0);
        r.render(&s);
        assert_ne!(*r.camera(), fitted);

        r.reset_camera();
        r.render(&s);
        assert_eq!(*r.camera(), fitted);
    }

    #[test]
    fn bounds_cover_both_batches() {
        let s = loaded();
        let (min, max) = scene_bounds(s.scene().unwrap(), s.layout().unwrap());
        // two 10 x 10 cells side by side with 0.5 spacing
        assert!(max[0] - min[0] >= 20.0);
        assert!(max[1] - min[1] >= 10.0);
    }
}
