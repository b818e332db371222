mod config;
pub mod contours;
pub mod geometry;
mod refine;
mod segment;
pub mod shape;
pub mod types;

pub use config::{ConfigError, DetectorConfig, MAX_KERNEL_SIZE};
pub use refine::MaskRefiner;
pub use segment::{GreenSegmenter, Segmenter};
pub use shape::ShapeValidator;
pub use types::{
    ChannelOrder, Contour, Detection, FrameAnalysis, Mask, Point, Quad, BACKGROUND, FOREGROUND,
};

use image::RgbImage;

/// Single green quadrilateral detector
///
/// Runs segment -> refine -> longest outer contour -> 4-vertex check ->
/// diagonal center on one frame. Holds no state between frames.
pub struct Detector {
    segmenter: Box<dyn Segmenter + Send>,
    refiner: MaskRefiner,
    validator: ShapeValidator,
}

impl Detector {
    pub fn new(config: &DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            segmenter: Box::new(GreenSegmenter::new(config.threshold, config.channel_order)),
            refiner: MaskRefiner::new(config.kernel_radius()),
            validator: ShapeValidator::new(config.epsilon_ratio),
        })
    }

    /// Swap in a different foreground rule, keeping the rest of the chain
    pub fn with_segmenter(mut self, segmenter: Box<dyn Segmenter + Send>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Segmenter output followed by morphological cleanup
    pub fn mask(&self, frame: &RgbImage) -> Mask {
        let mut mask = self.segmenter.segment(frame);
        self.refiner.refine(&mut mask);
        mask
    }

    /// Locate the marker in a refined mask
    pub fn locate(&self, mask: &Mask) -> Option<Detection> {
        let Some(contour) = contours::longest_contour(mask) else {
            tracing::debug!("No foreground contour");
            return None;
        };

        let quad = self.validator.validate(&contour)?;
        let center = geometry::diagonal_center(&quad);
        tracing::debug!("Marker center at ({}, {})", center.x, center.y);

        Some(Detection {
            corners: quad.corners,
            center,
        })
    }

    pub fn analyze(&self, frame: &RgbImage) -> FrameAnalysis {
        let _span = tracing::debug_span!("detect").entered();

        let mask = self.mask(frame);
        let detection = self.locate(&mask);
        FrameAnalysis { mask, detection }
    }
}
