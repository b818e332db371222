use imageproc::contours::{find_contours, BorderType};

use super::types::{Contour, Mask, Point};

/// Outer boundaries of every top-level foreground region in `mask`
///
/// Borders are traced with 8-connectivity. Holes, and regions nested inside
/// holes, are not reported. Straight runs are compressed to their endpoints.
pub fn external_contours(mask: &Mask) -> Vec<Contour> {
    let _span = tracing::debug_span!("contours").entered();

    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour::new(compress_runs(&c.points)))
        .collect()
}

/// Drop every point that continues the step direction of its predecessor,
/// treating `points` as a closed loop
pub fn compress_runs(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |from: Point, to: Point| ((to.x - from.x).signum(), (to.y - from.y).signum());

    let compressed: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if compressed.is_empty() {
        vec![points[0]]
    } else {
        compressed
    }
}

/// Index of the contour with the longest closed perimeter
///
/// Only a strictly longer perimeter replaces the current best, so the first
/// contour in trace order wins ties. Zero-length contours are never chosen.
pub fn longest_index(contours: &[Contour]) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_length = 0.0;
    for (i, contour) in contours.iter().enumerate() {
        let length = contour.perimeter();
        if length > best_length {
            best_length = length;
            best = Some(i);
        }
    }
    best
}

/// Convenience wrapper: trace `mask` and return the longest outer contour
pub fn longest_contour(mask: &Mask) -> Option<Contour> {
    let mut contours = external_contours(mask);
    let index = longest_index(&contours)?;
    Some(contours.swap_remove(index))
}
