//! Per-display-frame scheduling.
//!
//! Playback advances on every tick so no index change is missed. Rendering
//! and each widget sit behind their own [`RateLimiter`]; an index change only
//! marks them stale. A seek or an explicit redraw request skips the limiters
//! for that one tick.

use crate::config::ViewerConfig;
use crate::playback::PlaybackEvents;
use crate::render::FrameRenderer;
use crate::session::Session;
use crate::widgets::{Widget, WidgetKind};

/// Last-fired timestamp plus a minimum interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiter {
    min_interval: f64,
    last_fired: Option<f64>,
}

impl RateLimiter {
    /// `hz <= 0` (or non-finite) means unlimited.
    pub fn from_hz(hz: f64) -> Self {
        let min_interval = if hz.is_finite() && hz > 0.0 { 1.0 / hz } else { 0.0 };
        Self {
            min_interval,
            last_fired: None,
        }
    }

    pub fn min_interval(&self) -> f64 {
        self.min_interval
    }

    /// Fire (and record `now`) if the interval has elapsed.
    pub fn ready(&mut self, now: f64) -> bool {
        let due = match self.last_fired {
            None => true,
            // a clock that went backwards counts as due
            Some(last) => now - last >= self.min_interval || now < last,
        };
        if due {
            self.last_fired = Some(now);
        }
        due
    }

    /// Record a firing that bypassed the limiter.
    pub fn force(&mut self, now: f64) {
        self.last_fired = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

#[derive(Debug, Clone, Copy)]
struct WidgetClock {
    limiter: RateLimiter,
    dirty: bool,
}

impl WidgetClock {
    fn new(hz: f64) -> Self {
        Self {
            limiter: RateLimiter::from_hz(hz),
            // draw once on the first tick
            dirty: true,
        }
    }
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub events: PlaybackEvents,
    pub rendered: bool,
    pub refreshed: Vec<WidgetKind>,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    render: RateLimiter,
    playback_bar: WidgetClock,
    plot: WidgetClock,
    inspector: WidgetClock,
    /// Render on the next tick whatever the limiter says.
    render_pending: bool,
    /// The scene changed since the last render; drawn when the limiter fires.
    frame_stale: bool,
}

impl FrameScheduler {
    pub fn new(cfg: &ViewerConfig) -> Self {
        Self {
            render: RateLimiter::from_hz(cfg.render_hz),
            playback_bar: WidgetClock::new(cfg.playback_bar_hz),
            plot: WidgetClock::new(cfg.plot_hz),
            inspector: WidgetClock::new(cfg.inspector_hz),
            render_pending: true,
            frame_stale: false,
        }
    }

    fn clock_mut(&mut self, kind: WidgetKind) -> &mut WidgetClock {
        match kind {
            WidgetKind::PlaybackBar => &mut self.playback_bar,
            WidgetKind::Plot => &mut self.plot,
            WidgetKind::Inspector => &mut self.inspector,
        }
    }

    pub fn tick(
        &mut self,
        now: f64,
        session: &mut Session,
        renderer: &mut dyn FrameRenderer,
        widgets: &mut [&mut dyn Widget],
    ) -> FrameReport {
        let events = session.animate(now);
        let forced = session.take_redraw_request() || events.seeked;
        let playing = session.controller().is_some_and(|c| c.is_playing());
        if events.index_changed {
            self.frame_stale = true;
        }

        // 1. render + capture
        let rendered = if forced || self.render_pending {
            self.render.force(now);
            true
        } else {
            (self.frame_stale || playing) && self.render.ready(now)
        };
        if rendered {
            renderer.render(session);
            session.capture(renderer.frame());
            self.render_pending = false;
            self.frame_stale = false;
        }

        // 2. widgets
        let mut refreshed = Vec::new();
        for widget in widgets.iter_mut() {
            let clock = self.clock_mut(widget.kind());
            if events.index_changed || forced {
                clock.dirty = true;
            }
            // the playback bar also tracks continuous time while playing
            if playing && widget.kind() == WidgetKind::PlaybackBar {
                clock.dirty = true;
            }
            if !clock.dirty {
                continue;
            }
            let go = if forced {
                clock.limiter.force(now);
                true
            } else {
                clock.limiter.ready(now)
            };
            if go {
                widget.refresh(session);
                clock.dirty = false;
                refreshed.push(widget.kind());
            }
        }

        FrameReport {
            events,
            rendered,
            refreshed,
        }
    }

    /// Render on the next tick regardless of limiters (resize, camera moves).
    pub fn request_render(&mut self) {
        self.render_pending = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::two_batch_model;
    use crate::render::raster::FrameBuffer;
    use crate::state::tests::two_batch_states;
    use crate::widgets::Widgets;

    struct CountingRenderer {
        frame: FrameBuffer,
        renders: usize,
    }

    impl FrameRenderer for CountingRenderer {
        fn render(&mut self, _session: &Session) {
            self.renders += 1;
        }

        fn frame(&self) -> &FrameBuffer {
            &self.frame
        }
    }

    fn setup(cfg: ViewerConfig) -> (FrameScheduler, Session, CountingRenderer, Widgets) {
        let mut session = Session::new(cfg.clone());
        session.load_model_value(two_batch_model()).unwrap();
        session.load_states_value(two_batch_states()).unwrap();
        let renderer = CountingRenderer {
            frame: FrameBuffer::new(4, 4),
            renders: 0,
        };
        (FrameScheduler::new(&cfg), session, renderer, Widgets::default())
    }

    #[test]
    fn limiter_fires_at_most_once_per_interval() {
        let mut l = RateLimiter::from_hz(10.0);
        assert!(l.ready(0.0));
        assert!(!l.ready(0.05));
        assert!(l.ready(0.1));
        assert!(!l.ready(0.15));

        let mut unlimited = RateLimiter::from_hz(0.0);
        assert!(unlimited.ready(1.0));
        assert!(unlimited.ready(1.0));
    }

    #[test]
    fn idle_paused_session_does_no_work() {
        let (mut sched, mut session, mut r, mut w) = setup(ViewerConfig::default());
        let first = sched.tick(0.0, &mut session, &mut r, &mut w.all_mut());
        assert!(first.rendered);
        assert_eq!(first.refreshed.len(), 3);

        let second = sched.tick(1.0, &mut session, &mut r, &mut w.all_mut());
        assert!(!second.rendered);
        assert!(second.refreshed.is_empty());
        assert_eq!(r.renders, 1);
    }

    #[test]
    fn seek_bypasses_widget_limiters() {
        let cfg = ViewerConfig {
            plot_hz: 1.0,
            inspector_hz: 1.0,
            ..ViewerConfig::default()
        };
        let (mut sched, mut session, mut r, mut w) = setup(cfg);
        sched.tick(0.0, &mut session, &mut r, &mut w.all_mut());

        assert!(session.go_to_time(2.0));
        let report = sched.tick(0.01, &mut session, &mut r, &mut w.all_mut());
        assert!(report.events.seeked);
        assert!(report.rendered);
        assert!(report.refreshed.contains(&WidgetKind::Plot));
        assert!(report.refreshed.contains(&WidgetKind::Inspector));
        assert_eq!(w.inspector.time, 2.0);
    }

    #[test]
    fn slow_widgets_catch_up_when_their_limiter_allows() {
        let cfg = ViewerConfig {
            plot_hz: 2.0,
            ..ViewerConfig::default()
        };
        let (mut sched, mut session, mut r, mut w) = setup(cfg);
        sched.tick(0.0, &mut session, &mut r, &mut w.all_mut());
        session.play();
        sched.tick(0.01, &mut session, &mut r, &mut w.all_mut());

        // index changes at ~0.06; the plot limiter (0.5 s) holds it back
        let report = sched.tick(0.2, &mut session, &mut r, &mut w.all_mut());
        assert!(report.events.index_changed);
        assert!(report.rendered);
        assert!(!report.refreshed.contains(&WidgetKind::Plot));

        // still dirty, refreshed once the interval has passed
        let report = sched.tick(0.6, &mut session, &mut r, &mut w.all_mut());
        assert!(report.refreshed.contains(&WidgetKind::Plot));
    }

    #[test]
    fn playback_renders_at_render_hz() {
        let cfg = ViewerConfig {
            render_hz: 2.0,
            ..ViewerConfig::default()
        };
        let (mut sched, mut session, mut r, mut w) = setup(cfg);
        session.set_speed(10.0);
        session.play();

        let mut index_changes = 0;
        for i in 0..60 {
            let report = sched.tick(i as f64 / 60.0, &mut session, &mut r, &mut w.all_mut());
            if report.events.index_changed {
                index_changes += 1;
            }
        }
        assert!(index_changes > 3);
        // first frame plus one per half second
        assert_eq!(r.renders, 2);
    }

    #[test]
    fn index_change_while_paused_waits_for_the_limiter() {
        let cfg = ViewerConfig {
            render_hz: 2.0,
            ..ViewerConfig::default()
        };
        let (mut sched, mut session, mut r, mut w) = setup(cfg);
        sched.tick(0.0, &mut session, &mut r, &mut w.all_mut());

        assert!(session.step_forward());
        let report = sched.tick(0.1, &mut session, &mut r, &mut w.all_mut());
        assert!(report.events.index_changed);
        assert!(!report.rendered);

        let report = sched.tick(0.5, &mut session, &mut r, &mut w.all_mut());
        assert!(report.rendered);
        assert_eq!(r.renders, 2);
    }

    #[test]
    fn capture_follows_render() {
        let (mut sched, mut session, mut r, mut w) = setup(ViewerConfig::default());
        session.start_recording().unwrap();
        sched.tick(0.0, &mut session, &mut r, &mut w.all_mut());
        sched.tick(0.5, &mut session, &mut r, &mut w.all_mut());
        let rec = session.stop_recording().unwrap();
        assert_eq!(rec.frames.len(), r.renders);
    }
}
