use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::ChannelOrder;

/// Largest square kernel the morphology backend accepts (radius must fit in a `u8`)
pub const MAX_KERNEL_SIZE: u32 = 2 * u8::MAX as u32 + 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("kernel size must be an odd number between 1 and 511, got {0}")]
    InvalidKernelSize(u32),
    #[error("epsilon ratio must lie strictly between 0 and 1, got {0}")]
    InvalidEpsilonRatio(f64),
    #[error("failed to read detector config {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse detector config {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunable parameters of the marker detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Greenness (`green - blue - red`, saturating) must exceed this to count as foreground.
    pub threshold: u8,
    /// Side length of the square structuring element used for opening and closing.
    pub kernel_size: u32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub epsilon_ratio: f64,
    /// Channel layout of incoming frames.
    pub channel_order: ChannelOrder,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 30,
            kernel_size: 5,
            epsilon_ratio: 0.02,
            channel_order: ChannelOrder::Rgb,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 || self.kernel_size > MAX_KERNEL_SIZE
        {
            return Err(ConfigError::InvalidKernelSize(self.kernel_size));
        }
        if !self.epsilon_ratio.is_finite() || self.epsilon_ratio <= 0.0 || self.epsilon_ratio >= 1.0
        {
            return Err(ConfigError::InvalidEpsilonRatio(self.epsilon_ratio));
        }
        Ok(())
    }

    /// Load a JSON config file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Chebyshev radius of the structuring element
    pub fn kernel_radius(&self) -> u8 {
        (self.kernel_size / 2).min(u8::MAX as u32) as u8
    }
}
