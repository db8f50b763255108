//! The viewer context.
//!
//! A [`Session`] owns everything derived from the current model: layout,
//! entities, the playback controller and the active batch. It also holds the
//! accept-gate that keeps a late states payload from being applied to a scene
//! built from a different model.

use serde_json::Value;

use crate::config::ViewerConfig;
use crate::entity::{ArrowScales, Scene};
use crate::error::Result;
use crate::layout::{BatchLayout, Direction, Rgba};
use crate::model::Model;
use crate::net::transport::TransportEvent;
use crate::playback::{AnimationController, PlaybackEvents, Recording};
use crate::render::raster::FrameBuffer;
use crate::state::Timeline;

/// Result of feeding one transport event into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    ModelLoaded,
    StatesLoaded,
    /// States arrived while the gate was closed.
    StatesDropped,
    TransportFailed(String),
}

pub struct Session {
    config: ViewerConfig,
    model: Option<Model>,
    layout: Option<BatchLayout>,
    scene: Option<Scene>,
    controller: Option<AnimationController>,
    active_batch: usize,
    accept_states: bool,
    /// Bumped on every successful model or states load.
    generation: u64,
    /// Bumped on every successful model load only.
    model_generation: u64,
    redraw_requested: bool,
}

impl Session {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            model: None,
            layout: None,
            scene: None,
            controller: None,
            active_batch: 0,
            accept_states: false,
            generation: 0,
            model_generation: 0,
            redraw_requested: false,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    // ── Loading ──

    /// Replace the scene and reopen the gate once every entity is built.
    pub fn load_model(&mut self, model: Model) {
        // previous orchestration goes first
        self.controller = None;
        self.scene = None;
        self.layout = None;
        self.accept_states = false;

        let layout = BatchLayout::new(
            model.sim_batches,
            model.terrain.size_x,
            model.terrain.size_y,
            self.config.spacing,
        )
        .with_collapse(model.collapse);
        let scene = Scene::from_model(&model, ArrowScales::from_config(&self.config));

        self.layout = Some(layout);
        self.scene = Some(scene);
        self.model = Some(model);
        self.active_batch = 0;
        self.generation += 1;
        self.model_generation += 1;
        self.redraw_requested = true;
        self.accept_states = true;
    }

    /// On failure nothing of the previous model survives and the gate stays closed.
    pub fn load_model_value(&mut self, value: Value) -> Result<()> {
        match Model::from_value(value) {
            Ok(model) => {
                self.load_model(model);
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Returns `Ok(false)` when the payload was dropped by the gate.
    pub fn load_states_value(&mut self, value: Value) -> Result<bool> {
        let accept = std::mem::replace(&mut self.accept_states, false);
        let (Some(model), Some(scene)) = (self.model.as_ref(), self.scene.as_mut()) else {
            log::debug!("Dropping states: no model loaded");
            return Ok(false);
        };
        if !accept {
            log::debug!("Dropping stale states payload");
            return Ok(false);
        }

        let timeline = Timeline::from_value(
            value,
            model.dt,
            &model.scalar_names,
            self.config.default_timestep,
        )?;
        scene.freeze_attributes(&timeline);

        self.controller = None;
        let controller = AnimationController::load_animation(
            timeline,
            scene,
            self.config.playback_speed,
            &self.config.recording_format,
        );
        self.controller = Some(controller);
        self.generation += 1;
        self.redraw_requested = true;
        Ok(true)
    }

    pub fn apply(&mut self, event: TransportEvent) -> Result<Applied> {
        match event {
            TransportEvent::Model(v) => {
                self.load_model_value(v)?;
                Ok(Applied::ModelLoaded)
            }
            TransportEvent::States(v) => Ok(if self.load_states_value(v)? {
                Applied::StatesLoaded
            } else {
                Applied::StatesDropped
            }),
            TransportEvent::Error(msg) => Ok(Applied::TransportFailed(msg)),
        }
    }

    pub fn clear(&mut self) {
        self.controller = None;
        self.scene = None;
        self.layout = None;
        self.model = None;
        self.accept_states = false;
        self.active_batch = 0;
        self.redraw_requested = true;
    }

    pub fn accepts_states(&self) -> bool {
        self.accept_states
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn model_generation(&self) -> u64 {
        self.model_generation
    }

    // ── Per-frame ──

    pub fn animate(&mut self, now: f64) -> PlaybackEvents {
        match (self.controller.as_mut(), self.scene.as_mut()) {
            (Some(c), Some(s)) => c.animate(now, s),
            _ => PlaybackEvents::default(),
        }
    }

    pub fn capture(&mut self, frame: &FrameBuffer) {
        if let Some(c) = self.controller.as_mut() {
            c.capture(frame);
        }
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    // ── Batch selection ──

    pub fn active_batch(&self) -> usize {
        self.active_batch
    }

    pub fn set_active_batch(&mut self, index: usize) -> bool {
        let valid = self.layout.as_ref().is_some_and(|l| index < l.sim_batches());
        if valid && index != self.active_batch {
            self.active_batch = index;
            self.redraw_requested = true;
        }
        valid
    }

    pub fn set_active_batch_by_row_col(&mut self, row: isize, col: isize) -> bool {
        match self.layout.as_ref().and_then(|l| l.index_from_row_col(row, col)) {
            Some(index) => self.set_active_batch(index),
            None => false,
        }
    }

    pub fn move_active_batch(&mut self, dir: Direction) -> bool {
        match self.layout.as_ref().and_then(|l| l.neighbor(self.active_batch, dir)) {
            Some(index) => self.set_active_batch(index),
            None => false,
        }
    }

    pub fn color_for_batch(&self, index: usize) -> Option<Rgba> {
        self.layout.as_ref()?.color(index)
    }

    // ── Playback surface ──

    fn with_playback<T>(&mut self, f: impl FnOnce(&mut AnimationController, &mut Scene) -> T) -> Option<T> {
        match (self.controller.as_mut(), self.scene.as_mut()) {
            (Some(c), Some(s)) => Some(f(c, s)),
            _ => None,
        }
    }

    pub fn play(&mut self) {
        self.with_playback(|c, _| c.play());
    }

    pub fn pause(&mut self) {
        self.with_playback(|c, _| c.pause());
    }

    pub fn toggle_play(&mut self) {
        self.with_playback(|c, _| c.toggle_play());
    }

    pub fn step_forward(&mut self) -> bool {
        self.with_playback(|c, s| c.step_forward(s)).unwrap_or(false)
    }

    pub fn step_backward(&mut self) -> bool {
        self.with_playback(|c, s| c.step_backward(s)).unwrap_or(false)
    }

    pub fn go_to_time(&mut self, t: f64) -> bool {
        self.with_playback(|c, s| c.go_to_time(t, s)).unwrap_or(false)
    }

    pub fn set_speed(&mut self, speed: f64) -> bool {
        let ok = speed.is_finite() && speed > 0.0;
        if ok {
            self.config.playback_speed = speed;
            self.with_playback(|c, _| c.set_speed(speed));
        }
        ok
    }

    pub fn set_recording_format(&mut self, kind: &str) {
        self.config.recording_format = kind.to_string();
        self.with_playback(|c, _| c.set_recording_format(kind));
    }

    /// `Ok(false)` when there is nothing to record yet.
    pub fn start_recording(&mut self) -> Result<bool> {
        match self.with_playback(|c, s| c.start_recording(s)) {
            Some(r) => r.map(|()| true),
            None => Ok(false),
        }
    }

    pub fn stop_recording(&mut self) -> Option<Recording> {
        self.controller.as_mut()?.stop_recording()
    }

    pub fn current_time(&self) -> f64 {
        self.controller.as_ref().map_or(0.0, AnimationController::current_time)
    }

    pub fn total_time(&self) -> f64 {
        self.controller.as_ref().map_or(0.0, AnimationController::total_time)
    }

    // ── Accessors ──

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn layout(&self) -> Option<&BatchLayout> {
        self.layout.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn controller(&self) -> Option<&AnimationController> {
        self.controller.as_ref()
    }
}
