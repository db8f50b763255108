//! Discrete animation clock.
//!
//! `current_time` advances continuously while playing and loops modulo the
//! total duration; `current_index` is derived from it by nearest-neighbour
//! rounding and is what the scene actually shows.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Real seconds since the previous tick (0 when paused or just resumed).
    pub delta: f64,
    pub index_changed: bool,
}

#[derive(Debug, Clone)]
pub struct AnimationClock {
    len: usize,
    timestep: f64,
    total_time: f64,
    current_time: f64,
    current_index: usize,
    speed: f64,
    playing: bool,
    last_tick: Option<f64>,
}

impl AnimationClock {
    pub fn new(len: usize, timestep: f64, total_time: f64) -> Self {
        Self {
            len,
            timestep,
            total_time: if total_time.is_finite() { total_time.max(0.0) } else { 0.0 },
            current_time: 0.0,
            current_index: 0,
            speed: 1.0,
            playing: false,
            last_tick: None,
        }
    }

    /// `round(t / timestep)` clamped to the valid index range.
    pub fn get_state_index_for_time(&self, t: f64) -> usize {
        if self.len == 0 {
            return 0;
        }
        let raw = (t / self.timestep).round();
        if !(raw > 0.0) {
            return 0;
        }
        let last = self.len - 1;
        if raw >= last as f64 {
            last
        } else {
            raw as usize
        }
    }

    /// Advance by the wall-clock time since the previous tick.
    pub fn advance(&mut self, now: f64) -> Tick {
        if !self.playing {
            return Tick {
                delta: 0.0,
                index_changed: false,
            };
        }
        let delta = match self.last_tick.replace(now) {
            Some(prev) if now > prev => now - prev,
            _ => 0.0,
        };
        let mut t = self.current_time + delta * self.speed;
        if self.total_time > 0.0 {
            t = t.rem_euclid(self.total_time);
        } else {
            t = 0.0;
        }
        self.current_time = t;
        Tick {
            delta,
            index_changed: self.sync_index(),
        }
    }

    fn sync_index(&mut self) -> bool {
        let index = self.get_state_index_for_time(self.current_time);
        let changed = index != self.current_index;
        self.current_index = index;
        changed
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.playing = true;
            self.last_tick = None;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.last_tick = None;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Only while paused. Clamps at the last index. Returns whether the index moved.
    pub fn step_forward(&mut self) -> bool {
        if self.playing || self.len == 0 {
            return false;
        }
        let next = (self.current_index + 1).min(self.len - 1);
        self.jump_to_index(next)
    }

    /// Only while paused. Clamps at 0. Returns whether the index moved.
    pub fn step_backward(&mut self) -> bool {
        if self.playing {
            return false;
        }
        let prev = self.current_index.saturating_sub(1);
        self.jump_to_index(prev)
    }

    fn jump_to_index(&mut self, index: usize) -> bool {
        let changed = index != self.current_index;
        self.current_index = index;
        self.current_time = index as f64 * self.timestep;
        changed
    }

    /// Seek to `t`. Out-of-range or non-finite `t` is ignored and yields `None`;
    /// otherwise `Some(index_changed)`.
    pub fn go_to_time(&mut self, t: f64) -> Option<bool> {
        if !t.is_finite() || t < 0.0 || t > self.total_time {
            return None;
        }
        self.current_time = t;
        Some(self.sync_index())
    }

    /// Back to index 0 without touching play state.
    pub fn rewind(&mut self) -> bool {
        self.current_time = 0.0;
        self.last_tick = None;
        self.sync_index()
    }

    /// Finite, strictly positive multipliers only.
    pub fn set_speed(&mut self, speed: f64) -> bool {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
            true
        } else {
            false
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
