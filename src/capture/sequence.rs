use super::CaptureSource;
use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff", "webp"];

/// Frames read from image files, in path order, then end of stream
pub struct ImageSequenceCapture {
    pending: VecDeque<PathBuf>,
    width: u32,
    height: u32,
}

impl ImageSequenceCapture {
    /// Open a single image file, or every image file directly inside a directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let paths = if path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path)
                .with_context(|| format!("Failed to list {}", path.display()))?
            {
                let file = entry?.path();
                if file.is_file() && has_image_extension(&file) {
                    files.push(file);
                }
            }
            files.sort();
            files
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            bail!("Input {} does not exist", path.display());
        };

        if paths.is_empty() {
            bail!("No images found in {}", path.display());
        }

        // Resolution comes from the first frame; later frames must match it.
        let (width, height) = image::image_dimensions(&paths[0])
            .with_context(|| format!("Failed to read {}", paths[0].display()))?;

        tracing::info!(
            "Reading {} image(s) from {} at {}x{}",
            paths.len(),
            path.display(),
            width,
            height
        );

        Ok(Self {
            pending: paths.into(),
            width,
            height,
        })
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl CaptureSource for ImageSequenceCapture {
    fn capture_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let frame = image::open(&path)
            .with_context(|| format!("Failed to decode {}", path.display()))?
            .to_rgb8();

        if frame.dimensions() != (self.width, self.height) {
            bail!(
                "{} is {}x{}, expected {}x{}",
                path.display(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }

        Ok(Some(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
