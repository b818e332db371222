use super::OutputSink;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Raw YUYV frames written to a v4l2loopback device, viewable in any video app
pub struct V4L2Output {
    _device: Device,
    file: File,
    width: u32,
    height: u32,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let applied = device
            .set_format(&requested)
            .with_context(|| format!("Failed to set YUYV {}x{} on {}", width, height, path.display()))?;
        if (applied.width, applied.height) != (width, height) {
            tracing::warn!(
                "Loopback device accepted {}x{} instead of {}x{}",
                applied.width,
                applied.height,
                width,
                height
            );
        }

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            _device: device,
            file,
            width,
            height,
        })
    }
}

/// Pack an RGB frame as YUV 4:2:2 (Y0 U Y1 V per pixel pair)
///
/// An odd trailing pixel is paired with itself.
pub(crate) fn rgb_to_yuyv(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut packed = Vec::with_capacity(width.div_ceil(2) as usize * 4 * height as usize);

    for row in frame.rows() {
        let row: Vec<[i32; 3]> = row.map(ycbcr).collect();
        for pair in row.chunks(2) {
            let [y0, u0, v0] = pair[0];
            let [y1, u1, v1] = pair.get(1).copied().unwrap_or(pair[0]);
            packed.extend([y0, (u0 + u1) / 2, y1, (v0 + v1) / 2].map(|c| c.clamp(0, 255) as u8));
        }
    }

    packed
}

/// Full-range BT.601 in 8.8 fixed point
fn ycbcr(pixel: &Rgb<u8>) -> [i32; 3] {
    let [r, g, b] = pixel.0.map(i32::from);
    [
        (77 * r + 150 * g + 29 * b + 128) >> 8,
        ((-43 * r - 85 * g + 128 * b + 128) >> 8) + 128,
        ((128 * r - 107 * g - 21 * b + 128) >> 8) + 128,
    ]
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let resized;
        let frame = if frame.dimensions() != (self.width, self.height) {
            resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            &resized
        } else {
            frame
        };

        let yuyv_data = rgb_to_yuyv(frame);

        self.file
            .write_all(&yuyv_data)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }
}
