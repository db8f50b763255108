//! Playback orchestration.
//!
//! [`AnimationController`] owns the clock, the timeline and the recorder for
//! one loaded recording. Each tick it advances the clock and, only when the
//! discrete index moved, pushes the matching snapshot into the scene.

pub mod clock;
pub mod record;

use crate::entity::Scene;
use crate::error::Result;
use crate::render::raster::FrameBuffer;
use crate::state::Timeline;

pub use clock::{AnimationClock, Tick};
pub use record::{Recorder, Recording, RecordingFormat};

/// What happened during one `animate` call (or since the last one, for seeks).
#[derive(Debug, Default)]
pub struct PlaybackEvents {
    pub index_changed: bool,
    /// A seek happened; time-dependent widgets redraw regardless of throttling.
    pub seeked: bool,
    /// Set on the tick where a recording stopped itself.
    pub finished_recording: Option<Recording>,
}

#[derive(Debug)]
pub struct AnimationController {
    clock: AnimationClock,
    timeline: Timeline,
    recorder: Option<Recorder>,
    recording_format: String,
    pending_seek: bool,
    pending_index_change: bool,
}

impl AnimationController {
    /// Take ownership of `timeline`, pin the index to 0 and push state 0.
    pub fn load_animation(timeline: Timeline, scene: &mut Scene, speed: f64, recording_format: &str) -> Self {
        let mut clock = AnimationClock::new(timeline.len(), timeline.timestep(), timeline.total_time());
        clock.set_speed(speed);
        if let Some(first) = timeline.get(0) {
            scene.update_state(first);
        }
        Self {
            clock,
            timeline,
            recorder: None,
            recording_format: recording_format.to_string(),
            pending_seek: true,
            pending_index_change: true,
        }
    }

    /// One scheduler tick. Never fails.
    pub fn animate(&mut self, now: f64, scene: &mut Scene) -> PlaybackEvents {
        let Tick { delta, index_changed } = self.clock.advance(now);
        if index_changed {
            self.push_current(scene);
        }

        let mut events = PlaybackEvents {
            index_changed: index_changed || std::mem::take(&mut self.pending_index_change),
            seeked: std::mem::take(&mut self.pending_seek),
            finished_recording: None,
        };

        let done = self.recorder.as_mut().is_some_and(|r| r.advance(delta));
        if done {
            events.finished_recording = self.stop_recording();
        }
        events
    }

    fn push_current(&self, scene: &mut Scene) {
        if let Some(snapshot) = self.timeline.get(self.clock.current_index()) {
            scene.update_state(snapshot);
        }
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn toggle_play(&mut self) {
        if self.clock.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn step_forward(&mut self, scene: &mut Scene) -> bool {
        let moved = self.clock.step_forward();
        if moved {
            self.push_current(scene);
            self.pending_index_change = true;
        }
        moved
    }

    pub fn step_backward(&mut self, scene: &mut Scene) -> bool {
        let moved = self.clock.step_backward();
        if moved {
            self.push_current(scene);
            self.pending_index_change = true;
        }
        moved
    }

    /// Returns false (and changes nothing) for out-of-range or non-finite `t`.
    pub fn go_to_time(&mut self, t: f64, scene: &mut Scene) -> bool {
        match self.clock.go_to_time(t) {
            None => {
                log::debug!("Ignoring seek to {} (total {})", t, self.clock.total_time());
                false
            }
            Some(changed) => {
                if changed {
                    self.push_current(scene);
                    self.pending_index_change = true;
                }
                self.pending_seek = true;
                true
            }
        }
    }

    pub fn set_speed(&mut self, speed: f64) -> bool {
        self.clock.set_speed(speed)
    }

    pub fn set_recording_format(&mut self, kind: &str) {
        self.recording_format = kind.to_string();
    }

    pub fn recording_format(&self) -> &str {
        &self.recording_format
    }

    /// Seek to index 0, push state 0 and start playing while capturing.
    pub fn start_recording(&mut self, scene: &mut Scene) -> Result<()> {
        let format: RecordingFormat = self.recording_format.parse()?;
        self.clock.rewind();
        self.push_current(scene);
        self.pending_seek = true;
        self.pending_index_change = true;
        let duration = self.clock.total_time() / self.clock.speed();
        self.recorder = Some(Recorder::new(format, duration));
        self.clock.play();
        log::info!("Recording started ({:?}, {:.2}s)", format, duration);
        Ok(())
    }

    /// Stop capturing; play state is left as it is.
    pub fn stop_recording(&mut self) -> Option<Recording> {
        self.recorder.take().map(Recorder::finish)
    }

    /// Copy the freshly rendered frame into the active recording, if any.
    pub fn capture(&mut self, frame: &FrameBuffer) {
        if let Some(r) = self.recorder.as_mut() {
            r.capture(frame);
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn recorded_frames(&self) -> usize {
        self.recorder.as_ref().map_or(0, Recorder::frame_count)
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn total_time(&self) -> f64 {
        self.clock.total_time()
    }

    pub fn current_index(&self) -> usize {
        self.clock.current_index()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Time of the snapshot currently on display.
    pub fn current_state_time(&self) -> f64 {
        self.timeline
            .get(self.clock.current_index())
            .map_or(0.0, |s| s.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ArrowScales;
    use crate::model::Model;

    fn setup() -> (AnimationController, Scene) {
        let model = Model::from_value(crate::model::tests::two_batch_model()).unwrap();
        let mut scene = Scene::from_model(&model, ArrowScales::default());
        let timeline = Timeline::from_value(
            crate::state::tests::two_batch_states(),
            model.dt,
            &model.scalar_names,
            0.01,
        )
        .unwrap();
        scene.freeze_attributes(&timeline);
        let ctrl = AnimationController::load_animation(timeline, &mut scene, 1.0, "png");
        (ctrl, scene)
    }

    fn box_z(scene: &Scene) -> f32 {
        scene.body("Box").unwrap().pose(0).unwrap().position[2]
    }

    #[test]
    fn load_pushes_state_zero() {
        let (ctrl, scene) = setup();
        assert_eq!(ctrl.current_index(), 0);
        assert!(!ctrl.is_playing());
        assert_eq!(box_z(&scene), 1.0);
    }

    #[test]
    fn playing_pushes_only_on_index_change() {
        let (mut ctrl, mut scene) = setup();
        ctrl.animate(0.0, &mut scene);
        ctrl.play();
        let ev = ctrl.animate(1.0, &mut scene);
        assert!(!ev.index_changed);
        let ev = ctrl.animate(1.02, &mut scene);
        assert!(!ev.index_changed);
        let ev = ctrl.animate(1.3, &mut scene);
        assert!(ev.index_changed);
        assert_eq!(ctrl.current_index(), 3);
        assert!((box_z(&scene) - 1.15).abs() < 1e-5);
    }

    #[test]
    fn seek_raises_event_once() {
        let (mut ctrl, mut scene) = setup();
        ctrl.animate(0.0, &mut scene);
        assert!(ctrl.go_to_time(2.0, &mut scene));
        assert_eq!(ctrl.current_index(), 20);
        assert!((box_z(&scene) - 2.0).abs() < 1e-5);
        let ev = ctrl.animate(0.1, &mut scene);
        assert!(ev.seeked);
        assert!(ev.index_changed);
        assert!(!ctrl.animate(0.2, &mut scene).seeked);

        assert!(!ctrl.go_to_time(99.0, &mut scene));
        assert!(!ctrl.animate(0.3, &mut scene).seeked);
        assert_eq!(ctrl.current_index(), 20);
    }

    #[test]
    fn steps_are_ignored_while_playing() {
        let (mut ctrl, mut scene) = setup();
        assert!(ctrl.step_forward(&mut scene));
        assert_eq!(ctrl.current_index(), 1);
        ctrl.play();
        assert!(!ctrl.step_forward(&mut scene));
        assert!(!ctrl.step_backward(&mut scene));
        assert_eq!(ctrl.current_index(), 1);
    }

    #[test]
    fn unsupported_format_fails_recording_start() {
        let (mut ctrl, mut scene) = setup();
        ctrl.set_recording_format("webm");
        assert!(ctrl.start_recording(&mut scene).is_err());
        assert!(!ctrl.is_recording());
        assert!(!ctrl.is_playing());
    }

    #[test]
    fn recording_rewinds_plays_and_stops_itself() {
        let (mut ctrl, mut scene) = setup();
        ctrl.go_to_time(3.0, &mut scene);
        ctrl.start_recording(&mut scene).unwrap();
        assert_eq!(ctrl.current_index(), 0);
        assert_eq!(box_z(&scene), 1.0);
        assert!(ctrl.is_playing());

        let fb = FrameBuffer::new(4, 4);
        let mut finished = None;
        let mut t = 10.0;
        for _ in 0..200 {
            let ev = ctrl.animate(t, &mut scene);
            if ev.finished_recording.is_some() {
                finished = ev.finished_recording;
                break;
            }
            ctrl.capture(&fb);
            t += 0.05;
        }
        let rec = finished.expect("recording should stop after one loop");
        assert!(!rec.is_empty());
        assert!(!ctrl.is_recording());
        // stopping leaves play state untouched
        assert!(ctrl.is_playing());
    }

    #[test]
    fn manual_stop_returns_recording() {
        let (mut ctrl, mut scene) = setup();
        ctrl.set_recording_format("gif");
        ctrl.start_recording(&mut scene).unwrap();
        ctrl.capture(&FrameBuffer::new(2, 2));
        let rec = ctrl.stop_recording().unwrap();
        assert_eq!(rec.format, RecordingFormat::Gif);
        assert_eq!(rec.frames.len(), 1);
        assert!(ctrl.stop_recording().is_none());
    }
}
