use super::types::{Contour, Point, Quad};

/// Half-open run of contour indices; `end` may exceed the contour length and wraps
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

/// Douglas-Peucker simplification of a closed curve
///
/// The first split is seeded by two mutually distant points (three rounds of
/// "farthest point from the current start"), then each arc is split at its
/// farthest point from the chord until every dropped point lies within
/// `epsilon` of its chord. A final sweep over the polygon removes vertices
/// that sit within `epsilon / sqrt(2)` of the line through their kept
/// neighbours. Surviving vertices keep the order of `points`.
pub fn approximate_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    let mut poly = split_closed(points, epsilon);
    drop_shallow_vertices(&mut poly, epsilon);
    poly
}

fn split_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let at = |i: usize| points[i % n];

    let mut start = 0;
    let (mut far_offset, mut far_dist_sq) = farthest_from(points, start);
    for _ in 0..2 {
        start = (start + far_offset) % n;
        (far_offset, far_dist_sq) = farthest_from(points, start);
    }

    let epsilon_sq = epsilon * epsilon;
    if far_dist_sq <= epsilon_sq {
        return vec![points[start]];
    }

    let far = start + far_offset;
    let mut stack = vec![
        Span {
            start: far,
            end: start + n,
        },
        Span { start, end: far },
    ];
    let mut poly = Vec::new();

    while let Some(span) = stack.pop() {
        let first = at(span.start);
        if span.end <= span.start + 1 {
            poly.push(first);
            continue;
        }

        let last = at(span.end);
        let dx = (last.x - first.x) as f64;
        let dy = (last.y - first.y) as f64;

        // Cross product magnitude: perpendicular distance scaled by chord length.
        let mut max_cross = 0.0;
        let mut split = span.start;
        for i in span.start + 1..span.end {
            let p = at(i);
            let cross = ((p.y - first.y) as f64 * dx - (p.x - first.x) as f64 * dy).abs();
            if cross > max_cross {
                max_cross = cross;
                split = i;
            }
        }

        if max_cross * max_cross <= epsilon_sq * (dx * dx + dy * dy) {
            poly.push(first);
        } else {
            stack.push(Span {
                start: split,
                end: span.end,
            });
            stack.push(Span {
                start: span.start,
                end: split,
            });
        }
    }

    poly
}

/// One pass around the closed polygon, compacting survivors into the front of
/// `poly`
///
/// A vertex goes when its distance to the chord between the previous survivor
/// and the next vertex is small, the chord is not axis-aligned and the vertex
/// does not double back along it. The vertex after a removed one is kept
/// without being tested. The sweep stops early once two vertices are left.
fn drop_shallow_vertices(poly: &mut Vec<Point>, epsilon: f64) {
    let count = poly.len();
    if count < 3 {
        return;
    }
    let limit = 0.5 * epsilon * epsilon;

    let mut read = 0;
    let mut kept = count;
    let mut write = 0;
    let mut prev = poly[count - 1];
    let mut current = take(poly, &mut read);
    let mut i = 0;

    while i < count && kept > 2 {
        let following = take(poly, &mut read);
        let dx = following.x - prev.x;
        let dy = following.y - prev.y;
        let (px, py) = (current.x - prev.x, current.y - prev.y);

        let cross = (px as f64 * dy as f64 - py as f64 * dx as f64).abs();
        let onward = px as f64 * (following.x - current.x) as f64
            + py as f64 * (following.y - current.y) as f64;
        let chord_sq = (dx as f64).powi(2) + (dy as f64).powi(2);

        if dx != 0 && dy != 0 && onward >= 0.0 && cross * cross <= limit * chord_sq {
            kept -= 1;
            poly[write] = following;
            write = (write + 1) % count;
            prev = following;
            current = take(poly, &mut read);
            i += 2;
        } else {
            poly[write] = current;
            write = (write + 1) % count;
            prev = current;
            current = following;
            i += 1;
        }
    }

    poly.truncate(kept);
}

/// Reads `poly[*at]` and advances the cursor around the ring
fn take(poly: &[Point], at: &mut usize) -> Point {
    let p = poly[*at];
    *at = (*at + 1) % poly.len();
    p
}

/// Offset (1..n) of the point farthest from `points[start]`, with its squared distance
fn farthest_from(points: &[Point], start: usize) -> (usize, f64) {
    let n = points.len();
    let origin = points[start];
    let mut best = (0, 0.0);
    for offset in 1..n {
        let p = points[(start + offset) % n];
        let dx = (p.x - origin.x) as f64;
        let dy = (p.y - origin.y) as f64;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq > best.1 {
            best = (offset, dist_sq);
        }
    }
    best
}

/// Accepts contours that simplify to exactly four vertices
#[derive(Debug, Clone, Copy)]
pub struct ShapeValidator {
    epsilon_ratio: f64,
}

impl ShapeValidator {
    pub fn new(epsilon_ratio: f64) -> Self {
        Self { epsilon_ratio }
    }

    /// Tolerance used for `contour`, proportional to its own perimeter
    pub fn epsilon_for(&self, contour: &Contour) -> f64 {
        contour.perimeter() * self.epsilon_ratio
    }

    pub fn simplify(&self, contour: &Contour) -> Vec<Point> {
        let _span = tracing::debug_span!("approx").entered();
        approximate_closed(&contour.points, self.epsilon_for(contour))
    }

    pub fn validate(&self, contour: &Contour) -> Option<Quad> {
        let poly = self.simplify(contour);
        match <[Point; 4]>::try_from(poly) {
            Ok(corners) => Some(Quad { corners }),
            Err(poly) => {
                tracing::debug!("Rejected candidate with {} vertices", poly.len());
                None
            }
        }
    }
}
