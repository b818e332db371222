use super::OutputSink;
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Numbered PNG files in a directory: `<prefix>_000000.png`, `<prefix>_000001.png`, ...
pub struct ImageDirOutput {
    dir: PathBuf,
    prefix: String,
    index: u64,
}

impl ImageDirOutput {
    /// Create `dir` if needed
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        tracing::info!("Writing {} frames to {}", prefix, dir.display());

        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            index: 0,
        })
    }

    fn next_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}_{:06}.png", self.prefix, self.index))
    }
}

impl OutputSink for ImageDirOutput {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.next_path();
        frame
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.index += 1;
        Ok(())
    }
}
