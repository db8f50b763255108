//! Frame capture and export.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, RgbaImage};

use crate::error::{Result, SimviewError};
use crate::render::raster::FrameBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingFormat {
    /// Numbered PNG frames
    Png,
    /// Numbered JPEG frames
    Jpeg,
    /// One animated GIF
    Gif,
}

impl RecordingFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RecordingFormat::Png => "png",
            RecordingFormat::Jpeg => "jpg",
            RecordingFormat::Gif => "gif",
        }
    }
}

impl FromStr for RecordingFormat {
    type Err = SimviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(RecordingFormat::Png),
            "jpeg" | "jpg" => Ok(RecordingFormat::Jpeg),
            "gif" => Ok(RecordingFormat::Gif),
            _ => Err(SimviewError::UnsupportedRecordingFormat(s.to_string())),
        }
    }
}

/// Accumulates frames while a recording is active.
#[derive(Debug)]
pub struct Recorder {
    format: RecordingFormat,
    frames: Vec<RgbaImage>,
    elapsed: f64,
    /// Real seconds after which the recording stops itself.
    duration: f64,
}

impl Recorder {
    pub fn new(format: RecordingFormat, duration: f64) -> Self {
        Self {
            format,
            frames: Vec::new(),
            elapsed: 0.0,
            duration,
        }
    }

    /// Add real elapsed time; returns true once the full duration is covered.
    pub fn advance(&mut self, delta: f64) -> bool {
        self.elapsed += delta.max(0.0);
        self.elapsed >= self.duration
    }

    pub fn capture(&mut self, frame: &FrameBuffer) {
        if let Some(img) = frame.to_rgba_image() {
            self.frames.push(img);
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn finish(self) -> Recording {
        let interval = if self.frames.is_empty() {
            0.0
        } else {
            self.elapsed / self.frames.len() as f64
        };
        log::info!(
            "Recording finished: {} frames over {:.2}s",
            self.frames.len(),
            self.elapsed
        );
        Recording {
            format: self.format,
            frames: self.frames,
            frame_interval: interval,
        }
    }
}

/// A finished capture, ready to be written out.
#[derive(Debug, Clone)]
pub struct Recording {
    pub format: RecordingFormat,
    pub frames: Vec<RgbaImage>,
    /// Mean real seconds between captured frames.
    pub frame_interval: f64,
}

impl Recording {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Write into `dir` and return the files created.
    pub fn save(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let ext = self.format.extension();
        match self.format {
            RecordingFormat::Png | RecordingFormat::Jpeg => {
                let mut written = Vec::with_capacity(self.frames.len());
                for (i, img) in self.frames.iter().enumerate() {
                    let path = dir.join(format!("frame_{:05}.{}", i, ext));
                    if self.format == RecordingFormat::Jpeg {
                        // JPEG has no alpha channel
                        DynamicImage::ImageRgba8(img.clone()).to_rgb8().save(&path)?;
                    } else {
                        img.save(&path)?;
                    }
                    written.push(path);
                }
                Ok(written)
            }
            RecordingFormat::Gif => {
                let path = dir.join(format!("recording.{}", ext));
                let file = BufWriter::new(File::create(&path)?);
                let mut encoder = GifEncoder::new(file);
                encoder.set_repeat(Repeat::Infinite)?;
                let ms = (self.frame_interval * 1000.0).round().max(10.0) as u32;
                let frames = self
                    .frames
                    .iter()
                    .map(|img| Frame::from_parts(img.clone(), 0, 0, Delay::from_numer_denom_ms(ms, 1)));
                encoder.encode_frames(frames)?;
                Ok(vec![path])
            }
        }
    }
}
