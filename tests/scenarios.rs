use std::collections::VecDeque;

use anyhow::Result;
use image::{Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::rect::Rect;

use quadtrack::capture::CaptureSource;
use quadtrack::detection::contours::{external_contours, longest_contour};
use quadtrack::detection::geometry::diagonal_center;
use quadtrack::detection::{
    ChannelOrder, Detector, DetectorConfig, GreenSegmenter, MaskRefiner, Point, Quad, Segmenter,
    ShapeValidator, BACKGROUND, FOREGROUND,
};
use quadtrack::interrupt::FlagSignal;
use quadtrack::output::OutputSink;
use quadtrack::pipeline::{FramePipeline, Overlay, PipelineOptions, Sinks};
use quadtrack::StopReason;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GREEN: Rgb<u8> = Rgb([30, 210, 40]);

fn white_frame(w: u32, h: u32) -> RgbImage {
    RgbImage::from_pixel(w, h, WHITE)
}

fn detector() -> Detector {
    Detector::new(&DetectorConfig::default()).unwrap()
}

fn points(coords: &[(i32, i32)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

/// Deterministic pseudo-random bytes (xorshift)
fn noise(seed: u64) -> impl FnMut() -> u8 {
    let mut state = seed.max(1);
    move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 24) as u8
    }
}

#[test]
fn scenario_a_black_frame_has_no_detection() {
    let frame = RgbImage::new(120, 90);
    let analysis = detector().analyze(&frame);
    assert!(analysis.mask.pixels().all(|p| p[0] == BACKGROUND));
    assert!(analysis.detection.is_none());
}

#[test]
fn scenario_b_green_square_on_white() {
    let mut frame = white_frame(160, 120);
    draw_filled_rect_mut(&mut frame, Rect::at(40, 20).of_size(80, 80), GREEN);

    let segmenter = GreenSegmenter::new(30, ChannelOrder::Rgb);
    let mask = segmenter.segment(&frame);
    for (x, y, p) in mask.enumerate_pixels() {
        let inside = (40..120).contains(&x) && (20..100).contains(&y);
        assert_eq!(p[0] == FOREGROUND, inside, "pixel ({x}, {y})");
    }

    let mut refined = mask.clone();
    MaskRefiner::new(2).refine(&mut refined);
    assert_eq!(refined, mask);

    let contours = external_contours(&refined);
    assert_eq!(contours.len(), 1);

    let quad = ShapeValidator::new(0.02)
        .validate(&contours[0])
        .expect("square simplifies to four corners");
    let mut corners = quad.corners.to_vec();
    corners.sort_by_key(|p| (p.y, p.x));
    assert_eq!(corners, points(&[(40, 20), (119, 20), (40, 99), (119, 99)]));

    // True center is (79.5, 59.5).
    let center = diagonal_center(&quad);
    assert!((center.x as f64 - 79.5).abs() <= 1.0);
    assert!((center.y as f64 - 59.5).abs() <= 1.0);

    let detection = detector().analyze(&frame).detection.unwrap();
    assert_eq!(detection.center, center);
}

#[test]
fn scenario_b_rotated_marker() {
    let mut frame = white_frame(200, 200);
    let diamond = points(&[(100, 30), (170, 100), (100, 170), (30, 100)]);
    draw_polygon_mut(&mut frame, &diamond, GREEN);

    let detection = detector().analyze(&frame).detection.expect("diamond detected");
    // Opening shaves the tips, so allow a few pixels of slack.
    assert!((detection.center.x - 100).abs() <= 3);
    assert!((detection.center.y - 100).abs() <= 3);
    for corner in detection.corners {
        let near_vertex = diamond
            .iter()
            .any(|v| (v.x - corner.x).abs() <= 6 && (v.y - corner.y).abs() <= 6);
        assert!(near_vertex, "corner {corner:?} far from every vertex");
    }
}

#[test]
fn scenario_c_larger_shape_wins_regardless_of_position() {
    // Small shape first in trace order.
    let mut frame = white_frame(200, 160);
    draw_filled_rect_mut(&mut frame, Rect::at(10, 10).of_size(20, 20), GREEN);
    draw_filled_rect_mut(&mut frame, Rect::at(80, 60).of_size(90, 70), GREEN);
    let detection = detector().analyze(&frame).detection.unwrap();
    assert_eq!(detection.center, Point::new(124, 94));

    // Large shape first in trace order.
    let mut frame = white_frame(200, 160);
    draw_filled_rect_mut(&mut frame, Rect::at(10, 10).of_size(90, 70), GREEN);
    draw_filled_rect_mut(&mut frame, Rect::at(150, 120).of_size(20, 20), GREEN);
    let detection = detector().analyze(&frame).detection.unwrap();
    assert_eq!(detection.center, Point::new(54, 44));
}

#[test]
fn scenario_c_largest_contour_may_be_rejected() {
    // The larger region is a triangle: no fallback to the smaller square.
    let mut frame = white_frame(220, 200);
    draw_filled_rect_mut(&mut frame, Rect::at(5, 5).of_size(30, 30), GREEN);
    draw_polygon_mut(&mut frame, &points(&[(40, 190), (120, 40), (200, 190)]), GREEN);
    assert!(detector().analyze(&frame).detection.is_none());
}

#[test]
fn scenario_d_triangles_pentagons_and_circles_are_rejected() {
    let validator = ShapeValidator::new(0.02);
    let refine = |frame: &RgbImage| {
        let mut mask = GreenSegmenter::new(30, ChannelOrder::Rgb).segment(frame);
        MaskRefiner::new(2).refine(&mut mask);
        mask
    };

    let mut triangle = white_frame(200, 200);
    draw_polygon_mut(&mut triangle, &points(&[(20, 180), (100, 20), (180, 180)]), GREEN);
    let contour = longest_contour(&refine(&triangle)).unwrap();
    assert_eq!(validator.simplify(&contour).len(), 3);
    assert!(detector().analyze(&triangle).detection.is_none());

    let mut pentagon = white_frame(200, 200);
    let vertices: Vec<Point> = (0..5)
        .map(|k| {
            let angle = -std::f64::consts::FRAC_PI_2 + k as f64 * 2.0 * std::f64::consts::PI / 5.0;
            Point::new(
                (100.0 + 80.0 * angle.cos()).round() as i32,
                (100.0 + 80.0 * angle.sin()).round() as i32,
            )
        })
        .collect();
    draw_polygon_mut(&mut pentagon, &vertices, GREEN);
    let contour = longest_contour(&refine(&pentagon)).unwrap();
    assert_eq!(validator.simplify(&contour).len(), 5);
    assert!(detector().analyze(&pentagon).detection.is_none());

    let mut circle = white_frame(200, 200);
    draw_filled_circle_mut(&mut circle, (100, 100), 70, GREEN);
    let contour = longest_contour(&refine(&circle)).unwrap();
    assert!(validator.simplify(&contour).len() > 4);
    assert!(detector().analyze(&circle).detection.is_none());
}

struct Frames(VecDeque<RgbImage>);

impl CaptureSource for Frames {
    fn capture_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(self.0.pop_front())
    }

    fn resolution(&self) -> (u32, u32) {
        (160, 120)
    }
}

#[derive(Default)]
struct Collect(Vec<RgbImage>);

impl OutputSink for Collect {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.0.push(frame.clone());
        Ok(())
    }
}

#[test]
fn scenario_e_end_of_stream_terminates_cleanly() {
    let mut with_marker = white_frame(160, 120);
    draw_filled_rect_mut(&mut with_marker, Rect::at(50, 30).of_size(40, 40), GREEN);
    let mut capture = Frames(VecDeque::from(vec![
        RgbImage::new(160, 120),
        with_marker.clone(),
        white_frame(160, 120),
    ]));

    let mut frames = Collect::default();
    let mut masks = Collect::default();
    let summary = {
        let mut sinks = Sinks {
            frame: Some(&mut frames),
            mask: Some(&mut masks),
        };
        FramePipeline::new(
            detector(),
            Overlay::new(ChannelOrder::Rgb).unwrap(),
            PipelineOptions::default(),
        )
        .run(&mut capture, &mut sinks, &FlagSignal::new())
        .unwrap()
    };

    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.detections, 1);
    assert_eq!(frames.0.len(), 3);
    assert_eq!(masks.0.len(), 3);
    assert!(frames.0[0]
        .enumerate_pixels()
        .filter(|(_, y, _)| *y >= 40)
        .all(|(_, _, p)| *p == Rgb([0, 0, 0])));
    assert_ne!(frames.0[1], with_marker);
}

#[test]
fn segmenter_masks_are_strictly_binary() {
    let mut next = noise(7);
    let frame = RgbImage::from_fn(97, 61, |_, _| Rgb([next(), next(), next()]));
    for threshold in [0, 1, 30, 128, 254, 255] {
        let mask = GreenSegmenter::new(threshold, ChannelOrder::Rgb).segment(&frame);
        assert_eq!(mask.dimensions(), frame.dimensions());
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
}

#[test]
fn raising_the_threshold_never_adds_foreground() {
    let mut next = noise(99);
    let frame = RgbImage::from_fn(80, 80, |_, _| Rgb([next() / 3, next(), next() / 3]));

    let count = |threshold: u8| {
        GreenSegmenter::new(threshold, ChannelOrder::Rgb)
            .segment(&frame)
            .pixels()
            .filter(|p| p[0] == FOREGROUND)
            .count()
    };

    let mut previous = count(0);
    for threshold in 1..=255u8 {
        let current = count(threshold);
        assert!(current <= previous, "threshold {threshold} grew the mask");
        previous = current;
    }
}

#[test]
fn refining_a_refined_mask_is_stable() {
    let mut frame = white_frame(160, 120);
    draw_filled_rect_mut(&mut frame, Rect::at(30, 25).of_size(70, 60), GREEN);
    let mut next = noise(3);
    for _ in 0..300 {
        let x = next() as u32 % 160;
        let y = next() as u32 % 120;
        frame.put_pixel(x, y, if next() % 2 == 0 { GREEN } else { WHITE });
    }

    let detector = detector();
    let refined = detector.mask(&frame);
    let mut again = refined.clone();
    MaskRefiner::new(2).refine(&mut again);
    assert_eq!(refined, again);
}

#[test]
fn refined_speckle_never_forms_a_detection() {
    let mut next = noise(11);
    let mut frame = white_frame(120, 120);
    for _ in 0..200 {
        let x = next() as u32 % 120;
        let y = next() as u32 % 120;
        frame.put_pixel(x, y, GREEN);
    }
    let analysis = detector().analyze(&frame);
    assert!(analysis.mask.pixels().all(|p| *p == Luma([BACKGROUND])));
    assert!(analysis.detection.is_none());
}

#[test]
fn diagonal_center_lies_between_opposite_corners() {
    let mut next = noise(1234);
    for _ in 0..200 {
        // Convex quads in traversal order: one corner per quadrant around (128, 128).
        let corners = [
            Point::new(next() as i32 / 2, next() as i32 / 2),
            Point::new(128 + next() as i32 / 2, next() as i32 / 2),
            Point::new(128 + next() as i32 / 2, 128 + next() as i32 / 2),
            Point::new(next() as i32 / 2, 128 + next() as i32 / 2),
        ];
        let center = diagonal_center(&Quad { corners });
        let xs = corners.iter().map(|p| p.x);
        let ys = corners.iter().map(|p| p.y);
        assert!(center.x >= xs.clone().min().unwrap() && center.x <= xs.max().unwrap());
        assert!(center.y >= ys.clone().min().unwrap() && center.y <= ys.max().unwrap());
        // On the 0-2 diagonal, up to flooring.
        let (a, c) = (corners[0], corners[2]);
        let cross = (c.x - a.x) as i64 * (center.y - a.y) as i64
            - (c.y - a.y) as i64 * (center.x - a.x) as i64;
        let len = (((c.x - a.x).pow(2) + (c.y - a.y).pow(2)) as f64).sqrt();
        assert!(cross.abs() as f64 / len.max(1.0) <= 1.0);
    }
}
