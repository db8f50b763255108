//! Playback viewer for batched rigid-body simulation recordings.
//!
//! A recording is one model (terrain, bodies, static objects for N parallel
//! batches) plus a time series of states. The library ingests both, lays the
//! batches out on a grid, drives playback with a discrete clock and renders
//! every batch into a shared frame buffer. The `simview` binary wraps it in
//! an eframe window.

pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod layout;
pub mod math;
pub mod model;
pub mod net;
pub mod playback;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod widgets;

pub use config::ViewerConfig;
pub use error::{Result, SimviewError};
pub use session::Session;
