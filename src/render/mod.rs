//! Software rendering of the batched scene.

pub mod camera;
pub mod raster;
pub mod scene;

pub use camera::{Camera, CameraParams};
pub use raster::FrameBuffer;
pub use scene::{FrameRenderer, SoftwareRenderer};
