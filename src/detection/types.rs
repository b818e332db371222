use image::{GrayImage, Rgb};
use serde::{Deserialize, Serialize};

/// Integer pixel coordinate
pub type Point = imageproc::point::Point<i32>;

/// Binary foreground mask: every pixel is either `BACKGROUND` or `FOREGROUND`
/// Dimensions match the frame the mask was computed from
pub type Mask = GrayImage;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Storage order of the three 8-bit channels in a frame buffer
///
/// Frames are carried as `RgbImage` regardless of what the source produced;
/// this enum says which physical slot holds which colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    pub const fn red_index(self) -> usize {
        match self {
            ChannelOrder::Rgb => 0,
            ChannelOrder::Bgr => 2,
        }
    }

    pub const fn green_index(self) -> usize {
        1
    }

    pub const fn blue_index(self) -> usize {
        match self {
            ChannelOrder::Rgb => 2,
            ChannelOrder::Bgr => 0,
        }
    }

    /// Split a stored pixel into `(red, green, blue)`
    pub fn unpack(self, pixel: &Rgb<u8>) -> (u8, u8, u8) {
        (
            pixel[self.red_index()],
            pixel[self.green_index()],
            pixel[self.blue_index()],
        )
    }

    /// Build a stored pixel from logical `(red, green, blue)`
    pub fn pack(self, red: u8, green: u8, blue: u8) -> Rgb<u8> {
        let mut out = [0u8; 3];
        out[self.red_index()] = red;
        out[self.green_index()] = green;
        out[self.blue_index()] = blue;
        Rgb(out)
    }
}

/// Closed boundary of one connected foreground region, in trace order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Closed arc length, including the segment from the last point back to the first
    pub fn perimeter(&self) -> f64 {
        closed_arc_length(&self.points)
    }
}

pub(crate) fn closed_arc_length(points: &[Point]) -> f64 {
    let Some(last) = points.last() else {
        return 0.0;
    };

    let mut prev = *last;
    let mut length = 0.0;
    for &point in points {
        let dx = (point.x - prev.x) as f64;
        let dy = (point.y - prev.y) as f64;
        length += (dx * dx + dy * dy).sqrt();
        prev = point;
    }
    length
}

/// Four-vertex polygon accepted by the shape validator
///
/// Corners keep the traversal order of the contour they came from, so
/// `corners[0]`/`corners[2]` and `corners[1]`/`corners[3]` are opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    pub corners: [Point; 4],
}

/// A marker found in one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub corners: [Point; 4],
    pub center: Point,
}

/// Everything the detector produced for one frame
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Refined mask, kept for diagnostic display
    pub mask: Mask,
    pub detection: Option<Detection>,
}
