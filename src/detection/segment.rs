use image::{GrayImage, Luma, RgbImage};

use super::types::{ChannelOrder, Mask, BACKGROUND, FOREGROUND};

/// Trait for colour segmenters
/// Allows swapping the foreground rule without touching the rest of the detector
pub trait Segmenter {
    /// Produce a binary mask with the same dimensions as `frame`
    fn segment(&self, frame: &RgbImage) -> Mask;
}

/// Marks pixels whose green channel outweighs blue and red combined
///
/// Greenness is `green - blue - red` with saturating subtraction, so white,
/// grey and black pixels all collapse to zero.
#[derive(Debug, Clone, Copy)]
pub struct GreenSegmenter {
    threshold: u8,
    channel_order: ChannelOrder,
}

impl GreenSegmenter {
    pub fn new(threshold: u8, channel_order: ChannelOrder) -> Self {
        Self {
            threshold,
            channel_order,
        }
    }

    /// Per-pixel dominance of green over the other two channels
    pub fn greenness(&self, frame: &RgbImage) -> GrayImage {
        let order = self.channel_order;
        GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let (red, green, blue) = order.unpack(frame.get_pixel(x, y));
            Luma([green.saturating_sub(blue).saturating_sub(red)])
        })
    }
}

impl Segmenter for GreenSegmenter {
    fn segment(&self, frame: &RgbImage) -> Mask {
        let _span = tracing::debug_span!("segment").entered();

        let mut mask = self.greenness(frame);
        for pixel in mask.pixels_mut() {
            pixel[0] = if pixel[0] > self.threshold {
                FOREGROUND
            } else {
                BACKGROUND
            };
        }
        mask
    }
}
