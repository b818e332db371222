mod sequence;
mod webcam;

pub use sequence::ImageSequenceCapture;
pub use webcam::WebcamCapture;

use anyhow::Result;
use image::RgbImage;

/// Trait for frame sources
pub trait CaptureSource {
    /// Capture a single frame
    ///
    /// `Ok(None)` means the source is exhausted; errors are device failures.
    fn capture_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
