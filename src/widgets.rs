//! Widget models refreshed by the frame scheduler.
//!
//! Each widget keeps a plain-data snapshot of what it shows; the egui layer
//! only draws these snapshots, so refresh cost is paid at the widget's own
//! rate instead of every display frame.

use crate::entity::SceneEntity;
use crate::layout::Rgba;
use crate::math::Quat;
use crate::model::OptionalAttribute;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    PlaybackBar,
    Plot,
    Inspector,
}

pub trait Widget {
    fn kind(&self) -> WidgetKind;
    fn refresh(&mut self, session: &Session);
}

// ─── Playback bar ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct PlaybackBar {
    pub current_time: f64,
    pub total_time: f64,
    pub index: usize,
    pub len: usize,
    pub playing: bool,
    pub recording: bool,
    pub recorded_frames: usize,
    pub speed: f64,
}

impl Widget for PlaybackBar {
    fn kind(&self) -> WidgetKind {
        WidgetKind::PlaybackBar
    }

    fn refresh(&mut self, session: &Session) {
        match session.controller() {
            Some(c) => {
                self.current_time = c.current_time();
                self.total_time = c.total_time();
                self.index = c.current_index();
                self.len = c.timeline().len();
                self.playing = c.is_playing();
                self.recording = c.is_recording();
                self.recorded_frames = c.recorded_frames();
                self.speed = c.speed();
            }
            None => *self = PlaybackBar::default(),
        }
    }
}

// ─── Scalar plot ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PlotSeries {
    pub batch: usize,
    pub color: Rgba,
    pub points: Vec<(f64, f32)>,
}

#[derive(Debug, Clone, Default)]
pub struct ScalarPlot {
    /// Selected scalar; the first declared one when unset.
    pub selected: Option<String>,
    pub scalar_names: Vec<String>,
    pub series: Vec<PlotSeries>,
    pub active_batch: usize,
    pub cursor_time: f64,
    pub value_range: (f32, f32),
    built_for: Option<(u64, String)>,
}

impl ScalarPlot {
    pub fn select(&mut self, name: &str) {
        self.selected = Some(name.to_string());
    }

    fn rebuild(&mut self, session: &Session, name: &str) {
        self.series.clear();
        let Some(c) = session.controller() else {
            return;
        };
        let batches = session.layout().map_or(1, |l| l.sim_batches());
        for batch in 0..batches {
            self.series.push(PlotSeries {
                batch,
                color: session.color_for_batch(batch).unwrap_or(Rgba::WHITE),
                points: c.timeline().scalar_series(name, batch),
            });
        }
        let (lo, hi) = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        self.value_range = if lo <= hi { (lo, hi) } else { (0.0, 1.0) };
    }
}

impl Widget for ScalarPlot {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Plot
    }

    fn refresh(&mut self, session: &Session) {
        self.scalar_names = session.model().map(|m| m.scalar_names.clone()).unwrap_or_default();
        let name = self
            .selected
            .clone()
            .filter(|n| self.scalar_names.contains(n))
            .or_else(|| self.scalar_names.first().cloned());

        match name {
            Some(name) => {
                let key = (session.generation(), name.clone());
                if self.built_for.as_ref() != Some(&key) {
                    self.rebuild(session, &name);
                    self.built_for = Some(key);
                }
                self.selected = Some(name);
            }
            None => {
                self.series.clear();
                self.built_for = None;
            }
        }
        self.active_batch = session.active_batch();
        self.cursor_time = session
            .controller()
            .map_or(0.0, |c| c.current_state_time());
    }
}

// ─── Inspector ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BodyReadout {
    pub name: String,
    pub position: [f32; 3],
    /// Roll / pitch / yaw in degrees.
    pub euler_deg: [f32; 3],
    pub orientation_wxyz: [f32; 4],
    pub vectors: Vec<(OptionalAttribute, [f32; 3])>,
    pub active_contacts: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Inspector {
    pub batch: usize,
    pub time: f64,
    pub bodies: Vec<BodyReadout>,
    pub scalars: Vec<(String, f32)>,
}

impl Widget for Inspector {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Inspector
    }

    fn refresh(&mut self, session: &Session) {
        self.batch = session.active_batch();
        self.bodies.clear();
        self.scalars.clear();
        let Some(scene) = session.scene() else {
            return;
        };

        for body in &scene.bodies {
            let Some(pose) = body.pose(self.batch) else {
                continue;
            };
            let vectors = body
                .attribute_set()
                .into_iter()
                .filter(|a| *a != OptionalAttribute::Contacts)
                .filter_map(|a| body.vector(a, self.batch).map(|v| (a, v)))
                .collect();
            let active_contacts = body
                .has_attribute(OptionalAttribute::Contacts)
                .then(|| body.active_contacts(self.batch).len());
            self.bodies.push(BodyReadout {
                name: body.name().to_string(),
                position: pose.position,
                euler_deg: pose.orientation.to_euler_degrees(),
                orientation_wxyz: Quat::to_wxyz(pose.orientation),
                vectors,
                active_contacts,
            });
        }

        if let Some(c) = session.controller() {
            self.time = c.current_state_time();
            if let (Some(snapshot), Some(model)) = (c.timeline().get(c.current_index()), session.model()) {
                for name in &model.scalar_names {
                    if let Some(v) = snapshot.scalar(name, self.batch) {
                        self.scalars.push((name.clone(), v));
                    }
                }
            }
        }
    }
}

/// The three widgets the viewer shows.
#[derive(Debug, Default)]
pub struct Widgets {
    pub playback_bar: PlaybackBar,
    pub plot: ScalarPlot,
    pub inspector: Inspector,
}

impl Widgets {
    pub fn all_mut(&mut self) -> [&mut dyn Widget; 3] {
        [&mut self.playback_bar, &mut self.plot, &mut self.inspector]
    }
}
