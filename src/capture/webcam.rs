use super::CaptureSource;
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

/// Live camera frames, decoded to RGB
pub struct WebcamCapture {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// Open camera `device_index` and start streaming
    ///
    /// `resolution` asks the driver for a specific frame size; otherwise the
    /// highest the device offers is used. Fails if the device is missing or
    /// busy; callers treat that as fatal.
    pub fn new(device_index: u32, resolution: Option<(u32, u32)>) -> Result<Self> {
        tracing::info!("Opening webcam {}", device_index);

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        if let Some((width, height)) = resolution {
            camera
                .set_resolution(Resolution::new(width, height))
                .with_context(|| format!("Camera rejected resolution {}x{}", width, height))?;
        }

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        let resolution = camera.resolution();
        let (width, height) = (resolution.width(), resolution.height());
        tracing::info!("Webcam streaming at {}x{}", width, height);

        Ok(Self {
            camera,
            width,
            height,
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<Option<RgbImage>> {
        let frame = self.camera.frame().context("Failed to capture frame")?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        if decoded.width() == 0 || decoded.height() == 0 {
            return Ok(None);
        }
        Ok(Some(decoded))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop camera stream: {}", e);
        }
    }
}
