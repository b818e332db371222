use ab_glyph::{FontArc, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use std::path::Path;

use crate::detection::{ChannelOrder, Detection, Point};

const CENTER_RADIUS: i32 = 5;
const TEXT_SCALE: f32 = 20.0;
/// FPS readout sits this far left of the right edge
const TEXT_RIGHT_INSET: i32 = 150;
const TEXT_BASELINE: i32 = 30;

static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// Draws detection results and the frame rate onto a copy of the frame
pub struct Overlay {
    channel_order: ChannelOrder,
    font: FontArc,
}

impl Overlay {
    /// Overlay using the bundled DejaVu Sans Mono for the FPS readout
    pub fn new(channel_order: ChannelOrder) -> Result<Self> {
        let font = FontArc::try_from_slice(DEFAULT_FONT)
            .map_err(|_| anyhow!("Bundled font failed to parse"))?;
        Ok(Self {
            channel_order,
            font,
        })
    }

    /// Replace the readout font with a TrueType/OpenType file
    pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {}", path.display()))?;
        self.font = FontArc::try_from_vec(bytes)
            .map_err(|_| anyhow!("Failed to parse font file {}", path.display()))?;
        Ok(self)
    }

    fn red(&self) -> Rgb<u8> {
        self.channel_order.pack(255, 0, 0)
    }

    fn blue(&self) -> Rgb<u8> {
        self.channel_order.pack(0, 0, 255)
    }

    /// Quad edges, both diagonals, a filled center dot and the FPS label
    ///
    /// With no detection only the label is drawn. The label's left edge sits
    /// 150 px in from the right border with its baseline near y = 30.
    pub fn annotate(&self, frame: &RgbImage, detection: Option<&Detection>, fps: f64) -> RgbImage {
        let mut canvas = frame.clone();

        if let Some(detection) = detection {
            let red = self.red();
            let c = detection.corners;
            for i in 0..4 {
                thick_line(&mut canvas, c[i], c[(i + 1) % 4], red);
            }
            thick_line(&mut canvas, c[0], c[2], red);
            thick_line(&mut canvas, c[1], c[3], red);

            draw_filled_circle_mut(
                &mut canvas,
                (detection.center.x, detection.center.y),
                CENTER_RADIUS,
                self.blue(),
            );
        }

        let x = frame.width() as i32 - TEXT_RIGHT_INSET;
        let y = TEXT_BASELINE - TEXT_SCALE as i32;
        draw_text_mut(
            &mut canvas,
            self.red(),
            x,
            y,
            PxScale::from(TEXT_SCALE),
            &self.font,
            &fps_label(fps),
        );

        canvas
    }
}

pub fn fps_label(fps: f64) -> String {
    format!("FPS: {:.1}", fps)
}

/// Two-pixel line: the segment plus copies shifted right and down
fn thick_line(canvas: &mut RgbImage, from: Point, to: Point, color: Rgb<u8>) {
    for (ox, oy) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)] {
        draw_line_segment_mut(
            canvas,
            (from.x as f32 + ox, from.y as f32 + oy),
            (to.x as f32 + ox, to.y as f32 + oy),
            color,
        );
    }
}
