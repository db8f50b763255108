//! Viewer configuration.
//!
//! Defaults cover everything; a JSON file (`--config`) may override any subset
//! of fields, and a few `SIMVIEW_*` environment variables are applied last.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Gap between neighbouring batch cells, in world units.
    pub spacing: f32,
    /// Fallback timestep when neither `dt` nor the state times give one.
    pub default_timestep: f64,
    pub playback_speed: f64,
    /// Refresh rates in Hz; 0 means every frame.
    pub render_hz: f64,
    pub plot_hz: f64,
    pub inspector_hz: f64,
    pub playback_bar_hz: f64,
    /// Arrow length per unit of magnitude.
    pub velocity_scale: f32,
    pub angular_velocity_scale: f32,
    pub force_scale: f32,
    pub torque_scale: f32,
    pub recording_format: String,
    pub recording_dir: PathBuf,
    /// Frame buffer size used by the software renderer.
    pub frame_width: usize,
    pub frame_height: usize,
    /// Every n-th terrain grid line is drawn.
    pub terrain_stride: usize,
    pub request_timeout_secs: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            spacing: 0.5,
            default_timestep: 0.01,
            playback_speed: 1.0,
            render_hz: 60.0,
            plot_hz: 10.0,
            inspector_hz: 15.0,
            playback_bar_hz: 30.0,
            velocity_scale: 0.5,
            angular_velocity_scale: 0.25,
            force_scale: 0.05,
            torque_scale: 0.1,
            recording_format: String::from("png"),
            recording_dir: PathBuf::from("recordings"),
            frame_width: 960,
            frame_height: 600,
            terrain_stride: 4,
            request_timeout_secs: 120,
        }
    }
}

impl ViewerConfig {
    /// Read a (partial) JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Apply `SIMVIEW_SPEED`, `SIMVIEW_SPACING` and `SIMVIEW_RECORD_FORMAT`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = get("SIMVIEW_SPEED").and_then(|s| s.parse::<f64>().ok()) {
            if v.is_finite() && v > 0.0 {
                self.playback_speed = v;
            }
        }
        if let Some(v) = get("SIMVIEW_SPACING").and_then(|s| s.parse::<f32>().ok()) {
            if v.is_finite() && v >= 0.0 {
                self.spacing = v;
            }
        }
        if let Some(v) = get("SIMVIEW_RECORD_FORMAT") {
            self.recording_format = v;
        }
        self
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_playback_speed(mut self, speed: f64) -> Self {
        self.playback_speed = speed;
        self
    }

    pub fn with_recording_format(mut self, kind: impl Into<String>) -> Self {
        self.recording_format = kind.into();
        self
    }

    pub fn with_recording_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recording_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: ViewerConfig = serde_json::from_str(r#"{"spacing": 2.0, "plotHz": 4}"#).unwrap();
        assert_eq!(cfg.spacing, 2.0);
        assert_eq!(cfg.plot_hz, 4.0);
        assert_eq!(cfg.render_hz, 60.0);
        assert_eq!(cfg.recording_format, "png");
    }

    #[test]
    fn env_overrides_reject_bad_values() {
        let cfg = ViewerConfig::default().with_overrides(|k| match k {
            "SIMVIEW_SPEED" => Some("-3".into()),
            "SIMVIEW_SPACING" => Some("1.5".into()),
            "SIMVIEW_RECORD_FORMAT" => Some("gif".into()),
            _ => None,
        });
        assert_eq!(cfg.playback_speed, 1.0);
        assert_eq!(cfg.spacing, 1.5);
        assert_eq!(cfg.recording_format, "gif");
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, r#"{"recordingFormat": "jpeg"}"#).unwrap();
        let cfg = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(cfg.recording_format, "jpeg");
    }
}
